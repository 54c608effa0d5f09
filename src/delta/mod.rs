// The bsdiff algorithm proper.
//
// - `compute` — suffix-array driven copy/extra decomposition (diff side)
// - `apply`   — control replay against old data (patch side)

pub mod apply;
pub mod compute;

pub use apply::{FileSource, OldSource, apply};
pub use compute::{Delta, compute, compute_with_index};
