//! Error types for the engine.

use shelfdb_storage::StorageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by the engine's transaction interface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Log storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error outside the log (directory checks, lock file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No value stored under the requested key.
    #[error("no matching key found")]
    NotFound,

    /// The key already exists and `NO_OVERWRITE` was requested.
    #[error("key already exists")]
    KeyExists,

    /// The named sub-database has never been registered.
    #[error("sub-database not found: {name}")]
    SubDbNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// Registering another sub-database would exceed `max_dbs`.
    #[error("sub-database limit reached ({max})")]
    DbsFull {
        /// Configured limit.
        max: u32,
    },

    /// All reader slots are taken.
    #[error("reader limit reached ({max})")]
    ReadersFull {
        /// Configured limit.
        max: u32,
    },

    /// The sub-database handle does not belong to this environment.
    #[error("invalid sub-database handle {index}")]
    BadDbi {
        /// Offending handle index.
        index: u32,
    },

    /// Key or name is empty or longer than the engine accepts.
    #[error("unsupported key size {len} (max {max})")]
    BadValSize {
        /// Offending length.
        len: usize,
        /// Largest accepted length.
        max: usize,
    },

    /// A write was attempted through a read-only transaction.
    #[error("operation not allowed in a read-only transaction")]
    TxnReadOnly,

    /// The environment was opened with `EnvFlags::READ_ONLY`.
    #[error("environment is read-only")]
    ReadOnly,

    /// The environment path is missing or not a directory.
    #[error("invalid environment path: {}", path.display())]
    InvalidPath {
        /// Offending path.
        path: PathBuf,
    },

    /// Another connection holds the environment lock.
    #[error("environment locked: another connection has exclusive access")]
    Locked,

    /// Open options are unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },

    /// The commit log holds a record that cannot be replayed.
    #[error("log corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// The connection has been terminated.
    #[error("environment is closed")]
    Closed,
}

impl EngineError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true for [`EngineError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
