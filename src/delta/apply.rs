// Patch application: rebuild the new data from old data plus a patch.
//
// Each control triple is replayed as
//   copy:  out[..copy] = diff[..copy] + old[cursor..cursor + copy]  (mod 256)
//   extra: out[..extra] = extra stream
//   seek:  cursor += seek   (signed)
// Old bytes past the end of the old data contribute nothing, so the diff
// byte is emitted as-is.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{ControlField, Corruption, PatchError, Result};
use crate::format::{Control, PatchReader};

const CHUNK_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Old-data access
// ---------------------------------------------------------------------------

/// Random access to the old data during application.
pub trait OldSource {
    /// Read bytes at `offset` into `buf`, returning how many were available.
    /// Reading at or past the end returns 0.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize>;
}

/// In-memory old data.
impl OldSource for &[u8] {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        if offset >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - offset);
        buf[..n].copy_from_slice(&self[offset..offset + n]);
        Ok(n)
    }
}

/// Old data read from a seekable file. Read failures name the file.
pub struct FileSource {
    file: File,
    len: u64,
    path: PathBuf,
}

impl FileSource {
    /// Open `path` for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(PatchError::file(path))?;
        Self::new(file, path)
    }

    /// Wrap an already opened `file` that lives at `path`.
    pub fn new(file: File, path: &Path) -> Result<Self> {
        let len = file.metadata().map_err(PatchError::file(path))?.len();
        Ok(Self {
            file,
            len,
            path: path.to_path_buf(),
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OldSource for FileSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.len {
            return Ok(0);
        }
        let n = (buf.len() as u64).min(self.len - offset) as usize;
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(&mut buf[..n]))
            .map_err(PatchError::file(&self.path))?;
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Replay `patch` against `old`, writing the reconstruction to `out`.
///
/// Returns the number of bytes written, which always equals the header's
/// declared size on success. Validation failures stop application with a
/// corruption error; whatever was already written to `out` is left for the
/// caller to discard.
pub fn apply<S, R, W>(old: &mut S, patch: &mut PatchReader<R>, out: &mut W) -> Result<u64>
where
    S: OldSource + ?Sized,
    R: Read,
    W: Write + ?Sized,
{
    let new_size = patch.header().new_size;
    let mut new_pos = 0u64;
    let mut old_pos = 0i64;

    let mut data = vec![0u8; CHUNK_SIZE.min(new_size as usize).max(1)];
    let mut old_buf = vec![0u8; data.len()];

    while new_pos < new_size {
        let index = patch.controls_read();
        let control = patch.read_control()?;
        let (copy_len, extra_len) = check_control(index, &control, new_pos, new_size)?;
        log::trace!(
            "control #{index}: copy {copy_len} extra {extra_len} seek {} (old cursor {old_pos})",
            control.seek
        );

        // copy_len <= new_size <= i64::MAX, so the cast is lossless.
        if copy_len > 0 && (old_pos < 0 || old_pos.checked_add(copy_len as i64).is_none()) {
            return Err(Corruption::OldCursor {
                index,
                cursor: old_pos,
            }
            .into());
        }

        let mut remaining = copy_len;
        while remaining > 0 {
            let n = remaining.min(data.len() as u64) as usize;
            patch.read_diff(&mut data[..n])?;
            let available = old.read_at(old_pos as u64, &mut old_buf[..n])?;
            for (d, o) in data[..available].iter_mut().zip(&old_buf[..available]) {
                *d = d.wrapping_add(*o);
            }
            out.write_all(&data[..n])?;
            new_pos += n as u64;
            old_pos += n as i64;
            remaining -= n as u64;
        }

        if new_pos + extra_len > new_size {
            return Err(Corruption::ControlOverrun {
                index,
                field: ControlField::Extra,
                position: new_pos,
                length: extra_len,
                declared: new_size,
            }
            .into());
        }

        let mut remaining = extra_len;
        while remaining > 0 {
            let n = remaining.min(data.len() as u64) as usize;
            patch.read_extra(&mut data[..n])?;
            out.write_all(&data[..n])?;
            new_pos += n as u64;
            remaining -= n as u64;
        }

        old_pos = old_pos
            .checked_add(control.seek)
            .ok_or(Corruption::OldCursor {
                index,
                cursor: old_pos,
            })?;
    }

    log::debug!(
        "patch applied: {} controls, {new_pos} bytes written",
        patch.controls_read()
    );
    Ok(new_pos)
}

// Sign and copy-bounds checks; the extra bound is checked after the copy.
fn check_control(index: u64, control: &Control, new_pos: u64, new_size: u64) -> Result<(u64, u64)> {
    let field_len = |field: ControlField, value: i64| -> Result<u64> {
        u64::try_from(value).map_err(|_| {
            Corruption::NegativeControl {
                index,
                field,
                value,
            }
            .into()
        })
    };
    let copy_len = field_len(ControlField::Copy, control.copy_len)?;
    let extra_len = field_len(ControlField::Extra, control.extra_len)?;

    if new_pos + copy_len > new_size {
        return Err(Corruption::ControlOverrun {
            index,
            field: ControlField::Copy,
            position: new_pos,
            length: copy_len,
            declared: new_size,
        }
        .into());
    }
    Ok((copy_len, extra_len))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
