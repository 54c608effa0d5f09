// Patch opening and segment streaming.
//
// A `PatchReader` holds the validated header and three independent bzip2
// decoders, one per segment, so application can pull control triples, diff
// bytes and extra bytes in lockstep. Segment boundaries always come from the
// validated header:
//   - file patches use three handles, each seeked and bounded with `take`
//   - in-memory patches use three sub-slices

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Take};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;

use super::control::Control;
use super::header::{HEADER_SIZE, PatchHeader};
use crate::error::{Corruption, PatchError, Result, Segment};

/// Reader type for each segment of a patch opened from disk.
pub type FileSegment = Take<BufReader<File>>;

const READ_BUF_SIZE: usize = 64 * 1024;

/// An opened, header-validated patch.
pub struct PatchReader<R: Read> {
    header: PatchHeader,
    control: BzDecoder<R>,
    diff: BzDecoder<R>,
    extra: BzDecoder<R>,
    controls_read: u64,
    path: Option<PathBuf>,
}

impl<'a> PatchReader<&'a [u8]> {
    /// Open a patch held in memory.
    pub fn from_slice(patch: &'a [u8]) -> Result<Self> {
        let header = PatchHeader::parse(patch)?;
        header.check_bounds(patch.len() as u64)?;

        // Offsets fit in usize: check_bounds tied them to patch.len().
        let diff_at = header.diff_offset() as usize;
        let extra_at = header.extra_offset() as usize;

        Ok(Self::from_parts(
            header,
            &patch[HEADER_SIZE..diff_at],
            &patch[diff_at..extra_at],
            &patch[extra_at..],
        ))
    }
}

impl PatchReader<FileSegment> {
    /// Open a patch file, validating its header before any segment is read.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(PatchError::file(path))?;
        let patch_len = file.metadata().map_err(PatchError::file(path))?.len();

        let mut raw = [0u8; HEADER_SIZE];
        let filled = read_up_to(&mut file, &mut raw).map_err(PatchError::file(path))?;
        let header = PatchHeader::parse(&raw[..filled])?;
        header.check_bounds(patch_len)?;

        let extra_len = patch_len - header.extra_offset();
        let segment = |offset: u64, len: u64| -> Result<FileSegment> {
            let mut f = File::open(path).map_err(PatchError::file(path))?;
            f.seek(SeekFrom::Start(offset))
                .map_err(PatchError::file(path))?;
            Ok(BufReader::with_capacity(READ_BUF_SIZE, f).take(len))
        };

        let control = segment(HEADER_SIZE as u64, header.control_len)?;
        let diff = segment(header.diff_offset(), header.diff_len)?;
        let extra = segment(header.extra_offset(), extra_len)?;

        log::debug!(
            "opened patch {}: control={}B diff={}B extra={}B new size {}",
            path.display(),
            header.control_len,
            header.diff_len,
            extra_len,
            header.new_size
        );

        let mut reader = Self::from_parts(header, control, diff, extra);
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl<R: Read> PatchReader<R> {
    /// Wrap three already-positioned segment readers.
    pub fn from_parts(header: PatchHeader, control: R, diff: R, extra: R) -> Self {
        Self {
            header,
            control: BzDecoder::new(control),
            diff: BzDecoder::new(diff),
            extra: BzDecoder::new(extra),
            controls_read: 0,
            path: None,
        }
    }

    pub fn header(&self) -> &PatchHeader {
        &self.header
    }

    /// The patch file, when opened from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of control triples consumed so far.
    pub fn controls_read(&self) -> u64 {
        self.controls_read
    }

    /// Read the next control triple.
    pub fn read_control(&mut self) -> Result<Control> {
        let control = Control::read_from(&mut self.control)
            .map_err(|e| segment_error(Segment::Control, e, self.path.as_deref()))?;
        self.controls_read += 1;
        Ok(control)
    }

    /// Fill `buf` from the diff stream.
    pub fn read_diff(&mut self, buf: &mut [u8]) -> Result<()> {
        self.diff
            .read_exact(buf)
            .map_err(|e| segment_error(Segment::Diff, e, self.path.as_deref()))
    }

    /// Fill `buf` from the extra stream.
    pub fn read_extra(&mut self, buf: &mut [u8]) -> Result<()> {
        self.extra
            .read_exact(buf)
            .map_err(|e| segment_error(Segment::Extra, e, self.path.as_deref()))
    }
}

// Decoder failures are corruption; anything else is I/O on the patch file.
fn segment_error(segment: Segment, e: io::Error, path: Option<&Path>) -> PatchError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => Corruption::Truncated { segment }.into(),
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => Corruption::Undecodable {
            segment,
            message: e.to_string(),
        }
        .into(),
        _ => match path {
            Some(path) => PatchError::file(path)(e),
            None => PatchError::Io(e),
        },
    }
}

// Like `read_exact`, but reports how much was available instead of failing.
fn read_up_to<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
