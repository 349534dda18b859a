//! Index structures and construction.
//!
//! This module provides the cooperating indices behind the query engine:
//!
//! - [`bitset`] - Growable bit-set posting lists
//! - [`ordered`] - Lexicographic word sets with prefix scans
//! - [`bigram`] - 2-gram inverted index
//! - [`length`] - Word-length buckets
//! - [`bktree`] - Edit-distance metric tree
//! - [`build`] - Bulk and incremental construction
//! - [`snapshot`] - Binary snapshot codec (`LTC1`/`LTC2`)
//! - [`stats`] - Statistics and cross-index validation

pub mod bigram;
pub mod bitset;
pub mod bktree;
pub mod build;
pub mod length;
pub mod ordered;
pub mod snapshot;
pub mod stats;
pub mod types;

pub use bitset::IdBitSet;
pub use build::Indexes;
pub use types::{EngineConfig, WordId};
