// Integration tests for patch validation.
//
// Every structural defect must surface as a corruption error, never a panic,
// and in-place patching must leave the target untouched.

use std::fs;

use oxipatch::engine::{self, DiffOptions};
use oxipatch::error::{HeaderField, Segment};
use oxipatch::format::{Compression, Control, HEADER_SIZE, PatchHeader, PatchReader, write_patch};
use oxipatch::io::dirty;
use oxipatch::{Corruption, PatchError};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const OLD: &[u8] = b"The quick brown fox jumps over the lazy dog. 0123456789";
const NEW: &[u8] = b"The quick brown cat jumps over the lazy dog! 0123456789 extra";

fn sample_patch() -> Vec<u8> {
    engine::diff(OLD, NEW, &DiffOptions::default()).unwrap()
}

fn corruption(err: PatchError) -> Corruption {
    match err {
        PatchError::Corrupt(c) => c,
        other => panic!("expected corruption, got {other:?}"),
    }
}

fn set_i64(patch: &mut [u8], at: usize, value: i64) {
    let mut buf = value.unsigned_abs().to_le_bytes();
    if value < 0 {
        buf[7] |= 0x80;
    }
    patch[at..at + 8].copy_from_slice(&buf);
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[test]
fn any_magic_byte_flip_is_rejected() {
    let good = sample_patch();
    for i in 0..8 {
        for bit in [0x01, 0x20, 0x80] {
            let mut bad = good.clone();
            bad[i] ^= bit;
            let c = corruption(engine::patch(OLD, &bad).unwrap_err());
            assert!(matches!(c, Corruption::BadMagic { .. }), "byte {i}: {c}");
        }
    }
}

#[test]
fn negative_header_lengths_are_rejected() {
    let good = sample_patch();
    for (at, field) in [
        (8, HeaderField::ControlLength),
        (16, HeaderField::DiffLength),
        (24, HeaderField::NewSize),
    ] {
        let mut bad = good.clone();
        set_i64(&mut bad, at, -7);
        assert_eq!(
            corruption(engine::patch(OLD, &bad).unwrap_err()),
            Corruption::NegativeLength { field, value: -7 }
        );
    }
}

#[test]
fn short_patches_are_rejected() {
    let good = sample_patch();
    for len in [0, 4, 8, HEADER_SIZE - 1] {
        let c = corruption(engine::patch(OLD, &good[..len]).unwrap_err());
        assert_eq!(c, Corruption::TruncatedHeader { len: len as u64 });
    }
}

#[test]
fn segment_lengths_beyond_patch_are_rejected() {
    let mut bad = sample_patch();
    let total = bad.len() as i64;
    set_i64(&mut bad, 8, total);
    assert!(matches!(
        corruption(engine::patch(OLD, &bad).unwrap_err()),
        Corruption::SegmentOverrun { .. }
    ));
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

#[test]
fn truncated_extra_segment_is_rejected() {
    let good = sample_patch();
    let header = PatchHeader::parse(&good).unwrap();
    let cut = header.extra_offset() as usize;
    let err = engine::patch(OLD, &good[..cut]).unwrap_err();
    assert!(err.is_corrupt(), "{err}");
}

#[test]
fn truncated_patch_never_panics() {
    let good = sample_patch();
    for len in HEADER_SIZE..good.len() {
        if let Err(e) = engine::patch(OLD, &good[..len]) {
            assert!(e.is_corrupt(), "len {len}: {e}");
        }
    }
}

#[test]
fn garbage_control_segment_is_undecodable() {
    let mut bad = sample_patch();
    let header = PatchHeader::parse(&bad).unwrap();
    for b in &mut bad[HEADER_SIZE..header.diff_offset() as usize] {
        *b = 0x55;
    }
    match corruption(engine::patch(OLD, &bad).unwrap_err()) {
        Corruption::Undecodable { segment, .. } | Corruption::Truncated { segment } => {
            assert_eq!(segment, Segment::Control)
        }
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn header_lengths_match_segments() {
    let patch = sample_patch();
    let header = PatchHeader::parse(&patch).unwrap();
    assert_eq!(header.new_size, NEW.len() as u64);
    header.check_bounds(patch.len() as u64).unwrap();

    let mut reader = PatchReader::from_slice(&patch).unwrap();
    assert_eq!(reader.header(), &header);
    let first = reader.read_control().unwrap();
    assert!(first.copy_len >= 0 && first.extra_len >= 0);
}

#[test]
fn control_exceeding_declared_size_is_rejected() {
    let mut cur = std::io::Cursor::new(Vec::new());
    write_patch(
        &mut cur,
        &[Control::new(2, 10, 0)],
        &[0, 0],
        b"0123456789",
        5,
        Compression::fast(),
    )
    .unwrap();
    let c = corruption(engine::patch(b"ab", &cur.into_inner()).unwrap_err());
    assert!(matches!(c, Corruption::ControlOverrun { .. }), "{c}");
}

// ---------------------------------------------------------------------------
// File-level
// ---------------------------------------------------------------------------

#[test]
fn dirty_with_corrupt_patch_keeps_target() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("target.txt");
    let result = dir.path().join("result.txt");
    let patch = dir.path().join("corrupt.patch");
    fs::write(&target, b"Some content").unwrap();
    fs::write(&patch, [0x00, 0x01, 0x02, 0x03]).unwrap();

    let err = dirty(&target, &result, &patch).unwrap_err();
    assert_eq!(corruption(err), Corruption::TruncatedHeader { len: 4 });
    assert_eq!(fs::read(&target).unwrap(), b"Some content");
    assert!(!result.exists());
}

#[test]
fn dirty_with_truncated_patch_keeps_target() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("target");
    let result = dir.path().join("result");
    let patch = dir.path().join("p");
    fs::write(&target, OLD).unwrap();
    let good = sample_patch();
    fs::write(&patch, &good[..good.len() - 3]).unwrap();

    let err = dirty(&target, &result, &patch).unwrap_err();
    assert!(err.is_corrupt(), "{err}");
    assert_eq!(fs::read(&target).unwrap(), OLD);
    assert!(!result.exists());
}
