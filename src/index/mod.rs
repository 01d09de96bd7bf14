//! Building and persisting the content-type index.
//!
//! Data flows oracle → partition → classify → store:
//!
//! - [`oracle`] - Lists entries and sizes under a root from the disk usage oracle
//! - [`partition`] - Splits entries on the sniff threshold
//! - [`sniff`] - Content sniffers (byte window → label)
//! - [`classify`] - Bounded parallel classification
//! - [`store`] - Compressed snapshot of the whole index
//! - [`build`] - Orchestrates one full-replace index run
//! - [`info`] - Read-only store report

pub mod build;
pub mod classify;
pub mod info;
pub mod oracle;
pub mod partition;
pub mod sniff;
pub mod store;
pub mod types;

pub use build::{BuildReport, IndexBuilder};
pub use oracle::{DucOracle, Oracle};
pub use sniff::{BuiltinSniffer, ContentSniffer, FileCommandSniffer, SnifferKind};
pub use store::Store;
pub use types::*;
