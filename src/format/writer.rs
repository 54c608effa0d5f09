// Patch serialization.
//
// Writes a placeholder header, then the control, diff and extra segments
// through three independent bzip2 encoders, and finally seeks back to
// overwrite the header with the real segment lengths.

use std::io::{Seek, SeekFrom, Write};

use bzip2::Compression;
use bzip2::write::BzEncoder;

use super::control::{CONTROL_SIZE, Control};
use super::header::{HEADER_SIZE, PatchHeader};
use crate::error::Result;

/// Serialize a patch into `out`, starting at its current position.
///
/// Returns the header as finally written. On return `out` is positioned at
/// the end of the extra segment.
pub fn write_patch<W: Write + Seek>(
    out: &mut W,
    controls: &[Control],
    diff: &[u8],
    extra: &[u8],
    new_size: u64,
    level: Compression,
) -> Result<PatchHeader> {
    // Refuse an unencodable size before anything is written.
    let placeholder = PatchHeader::placeholder(new_size).to_bytes()?;
    let start = out.stream_position()?;
    out.write_all(&placeholder)?;

    let control_start = start + HEADER_SIZE as u64;
    let mut encoder = BzEncoder::new(&mut *out, level);
    let mut raw = Vec::with_capacity(controls.len() * CONTROL_SIZE);
    for control in controls {
        raw.extend_from_slice(&control.to_bytes());
    }
    encoder.write_all(&raw)?;
    encoder.finish()?;
    let diff_start = out.stream_position()?;

    let mut encoder = BzEncoder::new(&mut *out, level);
    encoder.write_all(diff)?;
    encoder.finish()?;
    let extra_start = out.stream_position()?;

    let mut encoder = BzEncoder::new(&mut *out, level);
    encoder.write_all(extra)?;
    encoder.finish()?;
    let end = out.stream_position()?;

    let header = PatchHeader {
        control_len: diff_start - control_start,
        diff_len: extra_start - diff_start,
        new_size,
    };
    out.seek(SeekFrom::Start(start))?;
    out.write_all(&header.to_bytes()?)?;
    out.seek(SeekFrom::Start(end))?;

    log::debug!(
        "patch written: {} controls, control={}B diff={}B extra={}B (compressed), new size {}",
        controls.len(),
        header.control_len,
        header.diff_len,
        end - extra_start,
        new_size
    );

    Ok(header)
}
