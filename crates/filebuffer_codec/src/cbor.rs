//! Generic serde codec storing elements as CBOR.

use crate::error::{CodecError, CodecResult};
use crate::{Decoder, Encoder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Codec for any `serde` type, using CBOR as the payload format.
///
/// The codec holds no state, so one instance can serve any number of buffers.
pub struct CborCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> CborCodec<T> {
    /// Creates a new CBOR codec.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> CborCodec<T> {
    /// Decodes a payload, keeping the reason for a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid CBOR for `T`.
    pub fn try_decode(&self, bytes: &[u8]) -> CodecResult<T> {
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }
}

impl<T> Default for CborCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CborCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Copy for CborCodec<T> {}

impl<T> fmt::Debug for CborCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CborCodec")
    }
}

impl<T: Serialize> Encoder<T> for CborCodec<T> {
    fn encode(&self, value: &T) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(value, &mut buf)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        Ok(buf)
    }
}

impl<T: DeserializeOwned> Decoder<T> for CborCodec<T> {
    fn decode(&self, bytes: &[u8]) -> Option<T> {
        self.try_decode(bytes).ok()
    }
}
