//! Error types for typed references.
//!
//! Callers branch on three kinds:
//!
//! - [`ErrorKind::InitFailed`]: the reference was never produced
//! - [`ErrorKind::PutFailed`]: nothing was written, prior state is unchanged
//! - [`ErrorKind::GetFailed`]: no value was produced
//!
//! Each error carries the [`Cause`] that triggered it, reachable through
//! [`std::error::Error::source`].

use shelfdb_codec::CodecError;
use shelfdb_engine::EngineError;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type for reference operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Directory creation, environment open or sub-database registration
    /// failed while initializing a reference.
    InitFailed,
    /// Encoding or the engine write failed.
    PutFailed,
    /// Encoding, the engine read, a missing key or decoding failed.
    GetFailed,
}

/// An error returned by a typed reference.
#[derive(Debug, Error)]
pub enum Error {
    /// Initialization failed; no reference was produced.
    #[error("failed to initialize reference {id:?}: {cause}")]
    InitFailed {
        /// Reference identifier.
        id: String,
        /// What went wrong.
        #[source]
        cause: Cause,
    },

    /// A put failed; the stored state is unchanged.
    #[error("failed to put key into {id:?}: {cause}")]
    PutFailed {
        /// Reference identifier.
        id: String,
        /// What went wrong.
        #[source]
        cause: Cause,
    },

    /// A get failed; no value was produced.
    #[error("failed to get key from {id:?}: {cause}")]
    GetFailed {
        /// Reference identifier.
        id: String,
        /// What went wrong.
        #[source]
        cause: Cause,
    },
}

impl Error {
    pub(crate) fn init(id: &str, cause: Cause) -> Self {
        Self::InitFailed {
            id: id.to_string(),
            cause,
        }
    }

    pub(crate) fn put(id: &str, cause: Cause) -> Self {
        Self::PutFailed {
            id: id.to_string(),
            cause,
        }
    }

    pub(crate) fn get(id: &str, cause: Cause) -> Self {
        Self::GetFailed {
            id: id.to_string(),
            cause,
        }
    }

    /// Returns the top-level kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InitFailed { .. } => ErrorKind::InitFailed,
            Self::PutFailed { .. } => ErrorKind::PutFailed,
            Self::GetFailed { .. } => ErrorKind::GetFailed,
        }
    }

    /// Returns the identifier of the reference involved.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::InitFailed { id, .. } | Self::PutFailed { id, .. } | Self::GetFailed { id, .. } => id,
        }
    }

    /// Returns the underlying cause.
    #[must_use]
    pub fn cause(&self) -> &Cause {
        match self {
            Self::InitFailed { cause, .. }
            | Self::PutFailed { cause, .. }
            | Self::GetFailed { cause, .. } => cause,
        }
    }

    /// Returns true if a get failed because nothing is stored under the key.
    ///
    /// The kind stays [`ErrorKind::GetFailed`]; this only inspects the cause.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.cause(), Cause::Read(err) if err.is_not_found())
    }
}

/// The step that failed.
///
/// Cloneable so that one failed environment open can be handed to every
/// reference that waited on it.
#[derive(Debug, Clone, Error)]
pub enum Cause {
    /// The environment directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        source: Arc<io::Error>,
    },

    /// The engine refused to open the environment.
    #[error("failed to open environment: {0}")]
    Open(#[source] Arc<EngineError>),

    /// The sub-database could not be registered or resolved.
    #[error("failed to resolve sub-database: {0}")]
    SubDb(#[source] Arc<EngineError>),

    /// The key could not be encoded.
    #[error("failed to encode key: {0}")]
    EncodeKey(#[source] CodecError),

    /// The value could not be encoded.
    #[error("failed to encode value: {0}")]
    EncodeValue(#[source] CodecError),

    /// The stored bytes could not be decoded into the value type.
    #[error("failed to decode value: {0}")]
    DecodeValue(#[source] CodecError),

    /// The engine rejected the write.
    #[error("failed to write key: {0}")]
    Write(#[source] Arc<EngineError>),

    /// The engine read failed, including a missing key.
    #[error("failed to read key: {0}")]
    Read(#[source] Arc<EngineError>),

    /// The transaction itself failed (closed environment, reader limit,
    /// commit log failure).
    #[error("transaction failed: {0}")]
    Txn(#[source] Arc<EngineError>),
}

impl From<EngineError> for Cause {
    fn from(err: EngineError) -> Self {
        Self::Txn(Arc::new(err))
    }
}

/// Errors from [`crate::Environment::close`].
#[derive(Debug, Error)]
pub enum CloseError {
    /// The environment was never opened successfully.
    #[error("environment was never opened")]
    NotOpen,

    /// `close` was already called.
    #[error("environment already closed")]
    AlreadyClosed,

    /// The engine failed while shutting down.
    #[error("engine error during close: {0}")]
    Engine(#[source] EngineError),
}
