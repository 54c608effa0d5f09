// BSDIFF40 patch format.
//
// - `int`     — 8-byte sign-magnitude integers
// - `header`  — 32-byte header (magic + segment lengths + new size)
// - `control` — (copy, extra, seek) triples
// - `writer`  — header + three bzip2 segments, header rewritten last
// - `reader`  — header validation and per-segment decompressing readers

pub mod control;
pub mod header;
pub mod int;
pub mod reader;
pub mod writer;

pub use bzip2::Compression;
pub use control::{CONTROL_SIZE, Control};
pub use header::{HEADER_SIZE, MAGIC, PatchHeader};
pub use reader::PatchReader;
pub use writer::write_patch;
