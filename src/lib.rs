//! # wordix - In-Memory Word Dictionary & Query Engine
//!
//! wordix keeps a dictionary of short words in memory and answers a rich mix
//! of lookup queries with sub-millisecond latency: exact, prefix, suffix,
//! arbitrary substring, length and id ranges, boolean compositions, and
//! bounded edit-distance similarity.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - The cooperating indices (ordered sets, 2-gram postings,
//!   length buckets, BK-tree), construction, and the snapshot codec
//! - [`dict`] - Authoritative record store and the string interner
//! - [`query`] - Query parsing, execution, and the similarity cache
//! - [`engine`] - Single owner tying everything to the append-only log
//! - [`store`] - Text-log reader/appender and the synthetic generator
//! - [`repl`] / [`output`] - Interactive session and result formatting
//!
//! ## Quick Start
//!
//! ```ignore
//! use wordix::engine::Engine;
//! use wordix::index::types::EngineConfig;
//! use wordix::query::parse_query;
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.add("apple")?;
//! engine.add("applet")?;
//!
//! let query = parse_query("sim apple 2")?;
//! for hit in engine.query(&query).hits {
//!     println!("{} (distance {:?})", hit.id, hit.distance);
//! }
//! ```
//!
//! ## Persistence
//!
//! Mutations append to a line-oriented text log and are fsynced immediately;
//! the last line wins per id on reload. A binary snapshot (`<log>.cache`)
//! written on clean shutdown lets the next start skip rebuilding the
//! prefix/suffix sets and the 2-gram and length indices; the dictionary and
//! the BK-tree are always rebuilt from the log.

pub mod dict;
pub mod engine;
pub mod index;
pub mod output;
pub mod query;
pub mod repl;
pub mod store;
pub mod utils;

pub use engine::Engine;
pub use index::types::EngineConfig;
pub use query::{parse_query, Query};
