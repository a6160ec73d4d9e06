//! # ShelfDB Codec
//!
//! Serialization strategies that turn typed keys and values into the opaque
//! bytes the engine stores.
//!
//! A [`Codec`] must be symmetric: `decode(encode(x)) == x` for every value of
//! the declared type, and decoding bytes into a type they were not encoded
//! from must fail rather than coerce. Keys are looked up by their encoded
//! bytes, so a key type must also encode deterministically (avoid hash maps
//! in key types).
//!
//! ## Available Codecs
//!
//! - [`CborCodec`] - CBOR via `ciborium`, the default
//! - [`JsonCodec`] - JSON via `serde_json`, readable with external tools
//!
//! ## Usage
//!
//! ```
//! use shelfdb_codec::{CborCodec, Codec};
//!
//! let codec = CborCodec;
//! let bytes = codec.encode("hello").unwrap();
//! let decoded: String = codec.decode(&bytes).unwrap();
//! assert_eq!(decoded, "hello");
//!
//! // Bytes holding a string do not decode as an integer.
//! assert!(codec.decode::<u64>(&bytes).is_err());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod json;

pub use cbor::CborCodec;
pub use error::{CodecError, CodecResult};
pub use json::JsonCodec;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A symmetric serialization strategy.
pub trait Codec: Send + Sync {
    /// Short codec name used in errors and diagnostics.
    const NAME: &'static str;

    /// Encodes `value` to bytes.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>>;

    /// Decodes bytes into a `T`.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T>;
}
