// BSDIFF40 patch header.
//
// Layout (32 bytes):
//   0..8    magic "BSDIFF40"
//   8..16   compressed control-segment length
//   16..24  compressed diff-segment length
//   24..32  uncompressed new-file size
// All three numbers use the sign-magnitude encoding from `int`.

use super::int::{self, INT_SIZE};
use crate::error::{Corruption, HeaderField, PatchError};

/// Patch magic signature.
pub const MAGIC: [u8; 8] = *b"BSDIFF40";

/// Fixed header length in bytes.
pub const HEADER_SIZE: usize = 32;

const CONTROL_LEN_OFFSET: usize = 8;
const DIFF_LEN_OFFSET: usize = 16;
const NEW_SIZE_OFFSET: usize = 24;

/// A validated patch header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatchHeader {
    /// Compressed size of the control segment.
    pub control_len: u64,
    /// Compressed size of the diff segment.
    pub diff_len: u64,
    /// Size of the file the patch reconstructs.
    pub new_size: u64,
}

impl PatchHeader {
    /// Header written before the segment lengths are known.
    pub fn placeholder(new_size: u64) -> Self {
        Self {
            control_len: 0,
            diff_len: 0,
            new_size,
        }
    }

    /// Serialize to the on-disk form.
    ///
    /// Fails when a field is larger than `i64::MAX`, the largest length the
    /// format can carry.
    pub fn to_bytes(&self) -> crate::error::Result<[u8; HEADER_SIZE]> {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..MAGIC.len()].copy_from_slice(&MAGIC);
        for (offset, name, value) in [
            (CONTROL_LEN_OFFSET, "control_len", self.control_len),
            (DIFF_LEN_OFFSET, "diff_len", self.diff_len),
            (NEW_SIZE_OFFSET, "new_size", self.new_size),
        ] {
            let value = i64::try_from(value).map_err(|_| PatchError::InvalidArgument {
                name,
                reason: format!("{value} does not fit in a signed 64-bit length"),
            })?;
            int::put_i64(value, &mut buf[offset..]);
        }
        Ok(buf)
    }

    /// Parse and validate a header from the start of `data`.
    ///
    /// Fails when fewer than 32 bytes are available, the magic differs, or
    /// any length field is negative.
    pub fn parse(data: &[u8]) -> Result<Self, Corruption> {
        if data.len() < HEADER_SIZE {
            return Err(Corruption::TruncatedHeader {
                len: data.len() as u64,
            });
        }

        let mut found = [0u8; 8];
        found.copy_from_slice(&data[..MAGIC.len()]);
        if found != MAGIC {
            return Err(Corruption::BadMagic { found });
        }

        let field = |offset: usize, field: HeaderField| -> Result<u64, Corruption> {
            let value = int::get_i64(&data[offset..offset + INT_SIZE]);
            u64::try_from(value).map_err(|_| Corruption::NegativeLength { field, value })
        };

        Ok(Self {
            control_len: field(CONTROL_LEN_OFFSET, HeaderField::ControlLength)?,
            diff_len: field(DIFF_LEN_OFFSET, HeaderField::DiffLength)?,
            new_size: field(NEW_SIZE_OFFSET, HeaderField::NewSize)?,
        })
    }

    /// Check that the control and diff segments fit inside a patch of
    /// `patch_len` total bytes.
    pub fn check_bounds(&self, patch_len: u64) -> Result<(), Corruption> {
        let available = patch_len.saturating_sub(HEADER_SIZE as u64);
        let declared = self.control_len.saturating_add(self.diff_len);
        if declared > available {
            return Err(Corruption::SegmentOverrun {
                declared,
                available,
            });
        }
        Ok(())
    }

    /// Absolute offset of the diff segment.
    pub fn diff_offset(&self) -> u64 {
        HEADER_SIZE as u64 + self.control_len
    }

    /// Absolute offset of the extra segment.
    pub fn extra_offset(&self) -> u64 {
        self.diff_offset() + self.diff_len
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatchHeader {
        PatchHeader {
            control_len: 41,
            diff_len: 1234,
            new_size: 99_999,
        }
    }

    #[test]
    fn magic_is_bsdiff40() {
        // Same bytes as the 64-bit constant 0x3034464649445342 stored little-endian.
        assert_eq!(MAGIC, 0x3034_4649_4944_5342u64.to_le_bytes());
    }

    #[test]
    fn serialize_then_parse() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"BSDIFF40");
        assert_eq!(PatchHeader::parse(&bytes).unwrap(), sample());
    }

    #[test]
    fn placeholder_keeps_new_size() {
        let bytes = PatchHeader::placeholder(17).to_bytes().unwrap();
        assert_eq!(&bytes[8..24], &[0u8; 16]);
        assert_eq!(int::get_i64(&bytes[24..]), 17);
    }

    #[test]
    fn oversized_fields_are_refused() {
        let max = i64::MAX as u64;
        let at_limit = PatchHeader {
            control_len: max,
            diff_len: max,
            new_size: max,
        };
        let bytes = at_limit.to_bytes().unwrap();
        assert_eq!(PatchHeader::parse(&bytes).unwrap(), at_limit);

        for (header, expected) in [
            (PatchHeader { control_len: max + 1, ..sample() }, "control_len"),
            (PatchHeader { diff_len: u64::MAX, ..sample() }, "diff_len"),
            (PatchHeader::placeholder(max + 1), "new_size"),
        ] {
            match header.to_bytes() {
                Err(PatchError::InvalidArgument { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected {expected} to be refused, got {other:?}"),
            }
        }
    }

    #[test]
    fn short_header_rejected() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(
            PatchHeader::parse(&bytes[..31]),
            Err(Corruption::TruncatedHeader { len: 31 })
        );
    }

    #[test]
    fn every_magic_byte_is_checked() {
        for i in 0..8 {
            let mut bytes = sample().to_bytes().unwrap();
            bytes[i] ^= 0x01;
            assert!(
                matches!(PatchHeader::parse(&bytes), Err(Corruption::BadMagic { .. })),
                "flip at byte {i} accepted"
            );
        }
    }

    #[test]
    fn negative_fields_rejected() {
        let cases = [
            (15, HeaderField::ControlLength),
            (23, HeaderField::DiffLength),
            (31, HeaderField::NewSize),
        ];
        for (sign_byte, expected) in cases {
            let mut bytes = sample().to_bytes().unwrap();
            bytes[sign_byte] |= 0x80;
            match PatchHeader::parse(&bytes) {
                Err(Corruption::NegativeLength { field, value }) => {
                    assert_eq!(field, expected);
                    assert!(value < 0);
                }
                other => panic!("expected negative length, got {other:?}"),
            }
        }
    }

    #[test]
    fn bounds_check() {
        let h = sample();
        let exact = HEADER_SIZE as u64 + 41 + 1234;
        assert!(h.check_bounds(exact).is_ok());
        assert_eq!(
            h.check_bounds(exact - 1),
            Err(Corruption::SegmentOverrun {
                declared: 1275,
                available: 1274,
            })
        );
    }

    #[test]
    fn segment_offsets() {
        let h = sample();
        assert_eq!(h.diff_offset(), 32 + 41);
        assert_eq!(h.extra_offset(), 32 + 41 + 1234);
    }
}
