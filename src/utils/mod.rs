//! Utility functions shared by the indexer, resolver and CLI.
//!
//! ## Modules
//!
//! - [`app_data`] - Configuration and per-user data locations
//! - [`format`] - Human readable sizes and timestamps
//! - [`paths`] - Path normalization and backoff helpers
//! - [`progress`] - Progress bars that compile away without the `progress` feature

pub mod app_data;
pub mod format;
pub mod paths;
pub mod progress;

pub use app_data::*;
pub use format::*;
pub use paths::*;
