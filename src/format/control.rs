// Control triples: one reconstruction step of a patch.

use std::io::{self, Read, Write};

use super::int::{self, INT_SIZE};

/// Encoded size of one control triple.
pub const CONTROL_SIZE: usize = 3 * INT_SIZE;

/// One `(copy, extra, seek)` step.
///
/// Apply `copy_len` bytes of old data plus diff, then `extra_len` literal
/// bytes, then move the old-file cursor by `seek` (which may be negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Control {
    pub copy_len: i64,
    pub extra_len: i64,
    pub seek: i64,
}

impl Control {
    pub fn new(copy_len: i64, extra_len: i64, seek: i64) -> Self {
        Self {
            copy_len,
            extra_len,
            seek,
        }
    }

    pub fn to_bytes(&self) -> [u8; CONTROL_SIZE] {
        let mut buf = [0u8; CONTROL_SIZE];
        int::put_i64(self.copy_len, &mut buf[0..]);
        int::put_i64(self.extra_len, &mut buf[INT_SIZE..]);
        int::put_i64(self.seek, &mut buf[2 * INT_SIZE..]);
        buf
    }

    pub fn from_bytes(buf: &[u8; CONTROL_SIZE]) -> Self {
        Self {
            copy_len: int::get_i64(&buf[0..]),
            extra_len: int::get_i64(&buf[INT_SIZE..]),
            seek: int::get_i64(&buf[2 * INT_SIZE..]),
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; CONTROL_SIZE];
        r.read_exact(&mut buf)?;
        Ok(Self::from_bytes(&buf))
    }
}
