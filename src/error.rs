//! Error types shared by the indexer, the store and the resolver.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort an index, query or store operation.
///
/// Per-entry classification failures never show up here: a file that vanishes
/// or cannot be read while sniffing is recorded under the `None` label instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The disk usage oracle could not be started
    #[error("oracle `{binary}` unavailable: {source}")]
    OracleUnavailable {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The oracle does not cover the requested path
    #[error("oracle has no data for {path}: {message}")]
    OracleQueryFailed { path: String, message: String },

    /// The oracle wrote something unexpected to its error stream
    #[error("oracle failed for {path}: {message}")]
    OracleFailed { path: String, message: String },

    /// The oracle did not finish before the caller's deadline
    #[error("oracle timed out after {secs}s for {path}")]
    OracleTimeout { path: String, secs: u64 },

    /// The persisted index exists but cannot be decoded
    #[error("index store {path} is corrupt: {message}")]
    StoreCorrupt { path: PathBuf, message: String },

    /// The persisted index could not be written
    #[error("failed to write index store {path}: {message}")]
    StoreWriteFailed { path: PathBuf, message: String },

    /// No indexed root covers the query path
    #[error("{0} is not indexed, run `dutype index` on it or one of its parents")]
    PathNotIndexed(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// The classifier worker pool could not be started
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// I/O error outside of the store and oracle paths
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// How bad a failure is for the invocation as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Severity {
    #[default]
    Ok,
    /// One path of a batch failed; the rest of the batch may continue
    PerPath,
    /// The whole invocation must stop
    Fatal,
}

impl Severity {
    /// Process exit code for this severity
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::PerPath => 1,
            Severity::Fatal => 2,
        }
    }
}

impl Error {
    /// Classify the error for batch handling and exit status.
    pub fn severity(&self) -> Severity {
        match self {
            Error::OracleUnavailable { .. }
            | Error::OracleQueryFailed { .. }
            | Error::OracleFailed { .. }
            | Error::OracleTimeout { .. }
            | Error::PathNotIndexed(_) => Severity::PerPath,
            Error::StoreCorrupt { .. }
            | Error::StoreWriteFailed { .. }
            | Error::Config(_)
            | Error::ThreadPool(_)
            | Error::Io(_) => Severity::Fatal,
        }
    }
}
