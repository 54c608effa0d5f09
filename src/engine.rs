// High-level in-memory API: ties the suffix index and delta computation to
// the BSDIFF40 patch format.
//
//   diff:  old + new  -> patch bytes
//   patch: old + patch bytes -> new

use std::io::{Cursor, Seek, Write};

use crate::delta::{self, Delta};
use crate::error::Result;
use crate::format::{self, Compression, PatchHeader, PatchReader};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for patch generation.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// bzip2 compression level (1-9) for all three segments. Values outside
    /// the range are clamped.
    pub level: u32,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl DiffOptions {
    pub fn compression(&self) -> Compression {
        Compression::new(self.level.clamp(1, 9))
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Produce a patch turning `old` into `new`.
pub fn diff(old: &[u8], new: &[u8], opts: &DiffOptions) -> Result<Vec<u8>> {
    let mut cur = Cursor::new(Vec::new());
    diff_to(old, new, &mut cur, opts)?;
    Ok(cur.into_inner())
}

/// Produce a patch turning `old` into `new`, writing it to `out`.
pub fn diff_to<W: Write + Seek>(
    old: &[u8],
    new: &[u8],
    out: &mut W,
    opts: &DiffOptions,
) -> Result<PatchHeader> {
    let delta = delta::compute(old, new);
    write_delta(&delta, out, opts)
}

/// Serialize an already computed delta.
pub fn write_delta<W: Write + Seek>(
    delta: &Delta,
    out: &mut W,
    opts: &DiffOptions,
) -> Result<PatchHeader> {
    format::write_patch(
        out,
        &delta.controls,
        &delta.diff,
        &delta.extra,
        delta.new_size,
        opts.compression(),
    )
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Apply `patch` to `old`, returning the reconstructed data.
pub fn patch(old: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
    let mut reader = PatchReader::from_slice(patch)?;
    // The declared size is untrusted; cap the up-front reservation.
    let reserve = reader.header().new_size.min(patch.len() as u64 * 8) as usize;
    let mut out = Vec::with_capacity(reserve);
    let mut src = old;
    delta::apply(&mut src, &mut reader, &mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
