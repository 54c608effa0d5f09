// Old-file indexing for match search.
//
// - `qsufsort` — suffix array construction (Larsson-Sadakane)
// - `search`   — binary search for the longest match of a new-file position

pub mod qsufsort;
pub mod search;

pub use qsufsort::SuffixArray;
pub use search::{Match, compare_bytes, match_len};
