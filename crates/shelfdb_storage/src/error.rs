//! Error types for log storage.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing a log.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to truncate the log beyond its current length.
    #[error("cannot truncate log to {requested} bytes, log is {len} bytes")]
    TruncatePastEnd {
        /// The requested length.
        requested: u64,
        /// The current log length.
        len: u64,
    },

    /// The log was opened read-only.
    #[error("log is read-only")]
    ReadOnly,

    /// The log is closed.
    #[error("log is closed")]
    Closed,
}
