//! Answering "what lives under this path" from the persisted index.
//!
//! - [`resolve`] - Longest-prefix lookup with hierarchical backoff

pub mod resolve;

pub use resolve::{Resolved, resolve, resolve_normalized};
