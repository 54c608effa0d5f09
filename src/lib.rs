//! Oxipatch: bsdiff-compatible binary diff and patch in Rust.
//!
//! Patches use the classic `BSDIFF40` layout: a 32-byte header followed by
//! three bzip2-compressed segments (control triples, byte-wise differences
//! and literal extra bytes). They interoperate with other bsdiff
//! implementations.
//!
//! The crate provides:
//! - Suffix-array construction and longest-match search (`index`)
//! - Delta computation and control replay (`delta`)
//! - The patch file format (`format`)
//! - In-memory diff/patch (`engine`)
//! - File-level clean/dirty helpers with atomic output (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use oxipatch::engine::{self, DiffOptions};
//!
//! let old = b"hello old world";
//! let new = b"hello new world";
//!
//! let patch = engine::diff(old, new, &DiffOptions::default()).unwrap();
//! let rebuilt = engine::patch(old, &patch).unwrap();
//! assert_eq!(rebuilt, new);
//! ```

pub mod delta;
pub mod engine;
pub mod error;
pub mod format;
pub mod index;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Corruption, PatchError, Result};
