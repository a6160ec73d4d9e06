//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to serialize a value.
    #[error("{codec} encoding failed: {message}")]
    EncodingFailed {
        /// Codec that failed.
        codec: &'static str,
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to deserialize bytes into the requested type.
    #[error("{codec} decoding into {target} failed: {message}")]
    DecodingFailed {
        /// Codec that failed.
        codec: &'static str,
        /// Rust type the bytes were decoded into.
        target: &'static str,
        /// Description of the decoding error.
        message: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(codec: &'static str, message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            codec,
            message: message.into(),
        }
    }

    /// Create a decoding failed error for target type `T`.
    pub fn decoding_failed<T: ?Sized>(codec: &'static str, message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            codec,
            target: std::any::type_name::<T>(),
            message: message.into(),
        }
    }
}
