// Error types shared by the diff, patch and file layers.
//
// `PatchError` is what every public operation returns. Structural problems
// with a patch artifact are grouped under `Corruption` so callers can tell a
// damaged patch apart from an I/O failure without string matching.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Segment / field names used in corruption reports
// ---------------------------------------------------------------------------

/// One of the three compressed streams in a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Control,
    Diff,
    Extra,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Control => "control",
            Self::Diff => "diff",
            Self::Extra => "extra",
        })
    }
}

/// Signed length fields of the patch header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    ControlLength,
    DiffLength,
    NewSize,
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ControlLength => "control length",
            Self::DiffLength => "diff length",
            Self::NewSize => "new-file size",
        })
    }
}

/// Length fields of a control triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlField {
    Copy,
    Extra,
}

impl fmt::Display for ControlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Copy => "copy length",
            Self::Extra => "extra length",
        })
    }
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

/// Structural validation failures of a patch artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Corruption {
    #[error("patch is {len} bytes, shorter than its 32-byte header")]
    TruncatedHeader { len: u64 },

    #[error("bad magic signature {found:02x?}, expected \"BSDIFF40\"")]
    BadMagic { found: [u8; 8] },

    #[error("negative {field} in header: {value}")]
    NegativeLength { field: HeaderField, value: i64 },

    #[error(
        "header declares {declared} bytes of control and diff data, \
         but only {available} bytes follow the header"
    )]
    SegmentOverrun { declared: u64, available: u64 },

    #[error("{segment} stream ended early")]
    Truncated { segment: Segment },

    #[error("{segment} stream is not valid bzip2 data: {message}")]
    Undecodable { segment: Segment, message: String },

    #[error("control #{index}: negative {field} {value}")]
    NegativeControl {
        index: u64,
        field: ControlField,
        value: i64,
    },

    #[error(
        "control #{index}: {field} {length} at output offset {position} \
         exceeds declared size {declared}"
    )]
    ControlOverrun {
        index: u64,
        field: ControlField,
        position: u64,
        length: u64,
        declared: u64,
    },

    #[error("control #{index}: old-file cursor {cursor} is out of range")]
    OldCursor { index: u64, cursor: i64 },
}

// ---------------------------------------------------------------------------
// PatchError
// ---------------------------------------------------------------------------

/// Errors returned by diff computation and patch application.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A caller-supplied argument was missing or empty.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The patch artifact failed structural validation.
    #[error("corrupt patch: {0}")]
    Corrupt(#[from] Corruption),

    /// File-system failure on a specific path.
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stream-level I/O failure with no associated path.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PatchError {
    /// True when the error comes from patch validation rather than I/O or
    /// argument checks.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }

    /// The corruption detail, if any.
    pub fn corruption(&self) -> Option<&Corruption> {
        match self {
            Self::Corrupt(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn file(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::File {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attach `path` to a path-less I/O error.
    pub(crate) fn at(self, path: &Path) -> Self {
        match self {
            Self::Io(source) => Self::File {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        }
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, PatchError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
