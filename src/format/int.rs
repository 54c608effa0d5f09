// BSDIFF40 fixed-width integer encoding.
//
// Every integer in the patch (header fields and control triples) occupies
// exactly 8 bytes: the magnitude little-endian across bytes 0..=7 with bit 7
// of byte 7 reserved as a sign flag. This is sign-magnitude, not two's
// complement and not a varint.

use std::io::{self, Read, Write};

/// Encoded width of one integer.
pub const INT_SIZE: usize = 8;

const SIGN_BIT: u8 = 0x80;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `value` as an 8-byte sign-magnitude integer.
///
/// `i64::MIN` has no positive counterpart; its magnitude already occupies the
/// sign bit, so it encodes as `00 .. 00 80` and decodes back as zero.
#[inline]
pub fn encode_i64(value: i64) -> [u8; INT_SIZE] {
    let mut buf = value.unsigned_abs().to_le_bytes();
    if value < 0 {
        buf[INT_SIZE - 1] |= SIGN_BIT;
    }
    buf
}

/// Encode into the first 8 bytes of `out`.
///
/// Panics if `out` is shorter than 8 bytes.
#[inline]
pub fn put_i64(value: i64, out: &mut [u8]) {
    out[..INT_SIZE].copy_from_slice(&encode_i64(value));
}

/// Encode and write to a `Write` sink.
pub fn write_i64<W: Write>(w: &mut W, value: i64) -> io::Result<()> {
    w.write_all(&encode_i64(value))
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode an 8-byte sign-magnitude integer.
#[inline]
pub fn decode_i64(buf: [u8; INT_SIZE]) -> i64 {
    let negative = buf[INT_SIZE - 1] & SIGN_BIT != 0;
    let mut magnitude = buf;
    magnitude[INT_SIZE - 1] &= !SIGN_BIT;
    // 63 significant bits always fit in i64.
    let value = u64::from_le_bytes(magnitude) as i64;
    if negative { -value } else { value }
}

/// Decode from the first 8 bytes of `buf`.
///
/// Panics if `buf` is shorter than 8 bytes.
#[inline]
pub fn get_i64(buf: &[u8]) -> i64 {
    let mut raw = [0u8; INT_SIZE];
    raw.copy_from_slice(&buf[..INT_SIZE]);
    decode_i64(raw)
}

/// Read one integer from a streaming source.
pub fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; INT_SIZE];
    r.read_exact(&mut buf)?;
    Ok(decode_i64(buf))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
