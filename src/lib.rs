//! # dutype - What kind of data lives under this directory?
//!
//! dutype keeps a persisted index from directory roots to a classification
//! of their content (content-type label and size), so the question can be
//! answered instantly instead of by rescanning the disk.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Oracle listing, size partitioning, parallel classification
//!   and the compressed index store
//! - [`query`] - Resolving a query path against the nearest indexed root
//! - [`output`] - Terminal rendering
//! - [`utils`] - Configuration, path normalization, formatting
//! - [`error`] - Error kinds and their severities
//!
//! ## Quick Start
//!
//! ```no_run
//! use dutype::index::{BuiltinSniffer, DucOracle, IndexBuilder, IndexOptions, Store};
//! use dutype::query::resolve;
//!
//! let store = Store::new("/tmp/dutype.bin.zst");
//! let oracle = DucOracle::default();
//! let sniffer = BuiltinSniffer::new();
//!
//! let builder = IndexBuilder::new(&store, &oracle, &sniffer, IndexOptions::default());
//! builder.index("/data").unwrap();
//!
//! let index = store.load().unwrap();
//! let resolved = resolve(&index, "/data/photos").unwrap();
//! for row in resolved.view.summary() {
//!     println!("{} {} {}", row.label, row.count, row.total_size);
//! }
//! ```
//!
//! The index is read fully into memory at the start of every operation and
//! written back as a complete snapshot after every successful index run.
//! Concurrent `index` runs against the same store are not coordinated: the
//! last one to save wins.

pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod utils;

pub use error::{Error, Result};
