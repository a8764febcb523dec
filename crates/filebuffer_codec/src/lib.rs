//! # filebuffer codec
//!
//! Turns buffer elements into record payloads and back.
//!
//! The buffer never looks inside a record; it only needs something that
//! implements [`Encoder`] to write and [`Decoder`] to read. A type that does
//! both is a [`Codec`].
//!
//! Decoding never fails outward. A payload that cannot be decoded, for any
//! reason, is reported as `None`, which is exactly what a buffer read returns
//! for an unreadable element. Encoding failures are real errors because they
//! abort a write.
//!
//! ## Provided codecs
//!
//! - [`CborCodec`] - any `serde` type, stored as CBOR
//! - `GzipCodec` - wraps another codec with optional gzip compression
//!   (feature `gzip`, on by default); wrapping a decode-only inner decoder
//!   gives a read-only decoder for compressed archives
//!
//! ## Usage
//!
//! ```
//! use filebuffer_codec::{CborCodec, Decoder, Encoder};
//!
//! let codec = CborCodec::<String>::new();
//! let bytes = codec.encode(&"hello".to_string()).unwrap();
//! assert_eq!(codec.decode(&bytes).as_deref(), Some("hello"));
//! assert_eq!(codec.decode(&[0xff]), None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
#[cfg(feature = "gzip")]
mod gzip;

pub use cbor::CborCodec;
pub use error::{CodecError, CodecResult};
#[cfg(feature = "gzip")]
pub use gzip::GzipCodec;

/// Write half of a codec.
pub trait Encoder<T> {
    /// Encodes `value` into a record payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented.
    fn encode(&self, value: &T) -> CodecResult<Vec<u8>>;
}

/// Read half of a codec.
///
/// Implementations must not panic on malformed input; any failure is `None`.
pub trait Decoder<T> {
    /// Decodes a record payload, or `None` if it cannot be decoded.
    fn decode(&self, bytes: &[u8]) -> Option<T>;
}

/// A bidirectional codec.
pub trait Codec<T>: Encoder<T> + Decoder<T> {}

impl<T, C> Codec<T> for C where C: Encoder<T> + Decoder<T> {}

impl<T, C: Encoder<T> + ?Sized> Encoder<T> for &C {
    fn encode(&self, value: &T) -> CodecResult<Vec<u8>> {
        (**self).encode(value)
    }
}

impl<T, C: Decoder<T> + ?Sized> Decoder<T> for &C {
    fn decode(&self, bytes: &[u8]) -> Option<T> {
        (**self).decode(bytes)
    }
}
