//! CBOR codec.

use crate::error::{CodecError, CodecResult};
use crate::Codec;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// CBOR encoding through `ciborium`.
///
/// Compact, self-describing, and strict about types: a text string never
/// decodes as a number, a map never decodes as a sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CborCodec;

impl Codec for CborCodec {
    const NAME: &'static str = "cbor";

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| CodecError::encoding_failed(Self::NAME, e.to_string()))?;
        Ok(buf)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        ciborium::from_reader(bytes)
            .map_err(|e| CodecError::decoding_failed::<T>(Self::NAME, e.to_string()))
    }
}
