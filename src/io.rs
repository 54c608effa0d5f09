// File-level clean (diff) and dirty (patch) operations.
//
// Both old and new files are read fully into memory for diffing. Patch
// application reads the old file through seeks and streams the output.
// Every file this module produces is written to a temporary file in the
// destination directory and renamed into place only after it is complete,
// so a failed call never leaves a partial file behind. Optional SHA-256
// digests are computed when the `file-io` feature is enabled.

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::delta::{self, FileSource, OldSource};
use crate::engine::{self, DiffOptions};
use crate::error::{PatchError, Result};
use crate::format::PatchReader;

#[cfg(feature = "file-io")]
use sha2::Digest;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `clean()`.
#[derive(Debug, Clone)]
pub struct DiffStats {
    /// Old file size in bytes.
    pub old_size: u64,
    /// New file size in bytes.
    pub new_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Number of control triples in the patch.
    pub controls: u64,
    /// New-file bytes rebuilt from old data.
    pub copied: u64,
    /// New-file bytes stored literally.
    pub inserted: u64,
    /// SHA-256 of the new file (if `file-io` feature is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `apply_file()` and `dirty()`.
#[derive(Debug, Clone)]
pub struct ApplyStats {
    /// Old file size in bytes.
    pub old_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Reconstructed file size in bytes.
    pub output_size: u64,
    /// Number of control triples replayed.
    pub controls: u64,
    /// SHA-256 of the reconstructed file (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// clean
// ---------------------------------------------------------------------------

/// Write a patch turning `old_path` into `new_path` to `patch_path`.
pub fn clean(old_path: &Path, new_path: &Path, patch_path: &Path) -> Result<DiffStats> {
    clean_with_options(old_path, new_path, patch_path, &DiffOptions::default())
}

/// `clean()` with explicit options.
pub fn clean_with_options(
    old_path: &Path,
    new_path: &Path,
    patch_path: &Path,
    opts: &DiffOptions,
) -> Result<DiffStats> {
    require_path("old_path", old_path)?;
    require_path("new_path", new_path)?;
    require_path("patch_path", patch_path)?;

    let old = fs::read(old_path).map_err(PatchError::file(old_path))?;
    let new = fs::read(new_path).map_err(PatchError::file(new_path))?;

    let delta = delta::compute(&old, &new);

    let mut tmp = temp_beside(patch_path)?;
    let patch_size = {
        let mut writer = BufWriter::with_capacity(BUF_SIZE, tmp.as_file_mut());
        engine::write_delta(&delta, &mut writer, opts).map_err(|e| e.at(patch_path))?;
        writer.flush().map_err(PatchError::file(patch_path))?;
        drop(writer);
        tmp.as_file()
            .metadata()
            .map_err(PatchError::file(patch_path))?
            .len()
    };
    persist(tmp, patch_path)?;

    let stats = DiffStats {
        old_size: old.len() as u64,
        new_size: new.len() as u64,
        patch_size,
        controls: delta.controls.len() as u64,
        copied: delta.copied(),
        inserted: delta.inserted(),
        new_sha256: sha256(&new),
    };

    if stats.patch_size > stats.new_size {
        log::warn!(
            "patch {} ({} bytes) is larger than {} ({} bytes)",
            patch_path.display(),
            stats.patch_size,
            new_path.display(),
            stats.new_size
        );
    }
    log::info!(
        "clean: {} -> {}: {} controls, patch {} bytes",
        old_path.display(),
        new_path.display(),
        stats.controls,
        stats.patch_size
    );

    Ok(stats)
}

// ---------------------------------------------------------------------------
// apply_file / dirty
// ---------------------------------------------------------------------------

/// Rebuild the new file from `old_path` and `patch_path` into `output_path`.
///
/// The old file is not modified. `output_path` is only created or replaced
/// once reconstruction has fully succeeded.
pub fn apply_file(old_path: &Path, patch_path: &Path, output_path: &Path) -> Result<ApplyStats> {
    require_path("old_path", old_path)?;
    require_path("patch_path", patch_path)?;
    require_path("output_path", output_path)?;

    let patch_size = fs::metadata(patch_path)
        .map_err(PatchError::file(patch_path))?
        .len();
    let mut reader = PatchReader::open(patch_path)?;

    let mut tmp = temp_beside(output_path)?;
    let (old_size, output_size, output_sha256) = {
        let mut old = FileSource::open(old_path)?;
        let writer = BufWriter::with_capacity(BUF_SIZE, tmp.as_file_mut());
        let (output_size, output_sha256) = replay(&mut old, &mut reader, writer, output_path)?;
        (old.len(), output_size, output_sha256)
    };
    persist(tmp, output_path)?;

    log::info!(
        "apply: {} + {} -> {} ({output_size} bytes)",
        old_path.display(),
        patch_path.display(),
        output_path.display()
    );

    Ok(ApplyStats {
        old_size,
        patch_size,
        output_size,
        controls: reader.controls_read(),
        output_sha256,
    })
}

/// Patch `target_path` in place.
///
/// The reconstruction is staged at `new_output_path` and then renamed onto
/// `target_path`. If anything fails before the rename, `target_path` is left
/// exactly as it was.
pub fn dirty(target_path: &Path, new_output_path: &Path, patch_path: &Path) -> Result<ApplyStats> {
    require_path("target_path", target_path)?;
    require_path("new_output_path", new_output_path)?;
    require_path("patch_path", patch_path)?;

    let stats = apply_file(target_path, patch_path, new_output_path)?;
    if new_output_path != target_path {
        fs::rename(new_output_path, target_path).map_err(PatchError::file(target_path))?;
    }
    log::info!("dirty: {} updated", target_path.display());
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Batch helpers (parallel feature)
// ---------------------------------------------------------------------------

/// One file pair to diff.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone)]
pub struct CleanJob {
    pub old: std::path::PathBuf,
    pub new: std::path::PathBuf,
    pub patch: std::path::PathBuf,
}

/// One file to patch in place.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone)]
pub struct DirtyJob {
    pub target: std::path::PathBuf,
    pub new_output: std::path::PathBuf,
    pub patch: std::path::PathBuf,
}

/// Run independent `clean` jobs on the rayon pool. Results are in job order.
#[cfg(feature = "parallel")]
pub fn clean_all(jobs: &[CleanJob], opts: &DiffOptions) -> Vec<Result<DiffStats>> {
    use rayon::prelude::*;
    jobs.par_iter()
        .map(|job| clean_with_options(&job.old, &job.new, &job.patch, opts))
        .collect()
}

/// Run independent `dirty` jobs on the rayon pool. Results are in job order.
#[cfg(feature = "parallel")]
pub fn dirty_all(jobs: &[DirtyJob]) -> Vec<Result<ApplyStats>> {
    use rayon::prelude::*;
    jobs.par_iter()
        .map(|job| dirty(&job.target, &job.new_output, &job.patch))
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_path(name: &'static str, path: &Path) -> Result<()> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(PatchError::InvalidArgument {
            name,
            reason: "path must not be empty".into(),
        });
    }
    Ok(())
}

fn temp_beside(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(".oxipatch-")
        .tempfile_in(dir)
        .map_err(PatchError::file(dir))
}

fn persist(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path)
        .map(|_| ())
        .map_err(|e| PatchError::file(path)(e.error))
}

// Apply `patch` into `out`, naming `output_path` in any error raised while
// writing. Old-file errors already carry their path from `FileSource`.
fn replay<S, R, W>(
    old: &mut S,
    patch: &mut PatchReader<R>,
    out: W,
    output_path: &Path,
) -> Result<(u64, Option<[u8; 32]>)>
where
    S: OldSource + ?Sized,
    R: Read,
    W: Write,
{
    let mut out = OutputWriter {
        inner: out,
        failed: false,
    };
    apply_hashed(old, patch, &mut out).map_err(|e| if out.failed { e.at(output_path) } else { e })
}

#[cfg(feature = "file-io")]
fn apply_hashed<S, R, W>(
    old: &mut S,
    patch: &mut PatchReader<R>,
    out: &mut W,
) -> Result<(u64, Option<[u8; 32]>)>
where
    S: OldSource + ?Sized,
    R: Read,
    W: Write,
{
    let mut hasher = sha2::Sha256::new();
    let n = delta::apply(
        old,
        patch,
        &mut HashingWriter {
            inner: &mut *out,
            hasher: &mut hasher,
        },
    )?;
    out.flush()?;
    Ok((n, Some(hasher.finalize().into())))
}

#[cfg(not(feature = "file-io"))]
fn apply_hashed<S, R, W>(
    old: &mut S,
    patch: &mut PatchReader<R>,
    out: &mut W,
) -> Result<(u64, Option<[u8; 32]>)>
where
    S: OldSource + ?Sized,
    R: Read,
    W: Write,
{
    let n = delta::apply(old, patch, out)?;
    out.flush()?;
    Ok((n, None))
}

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Output writers
// ---------------------------------------------------------------------------

// Remembers whether the destination itself failed.
struct OutputWriter<W: Write> {
    inner: W,
    failed: bool,
}

impl<W: Write> Write for OutputWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.write(buf) {
            Ok(0) if !buf.is_empty() => {
                self.failed = true;
                Ok(0)
            }
            Err(e) if e.kind() != io::ErrorKind::Interrupted => {
                self.failed = true;
                Err(e)
            }
            other => other,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().inspect_err(|_| self.failed = true)
    }
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
