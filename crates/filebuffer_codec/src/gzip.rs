//! Optional gzip compression around another codec.

use crate::error::{CodecError, CodecResult};
use crate::{Decoder, Encoder};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::borrow::Cow;
use std::io::{Read, Write};

/// Wraps an inner codec, gzip-compressing its payloads when `compressing` is set.
///
/// The wrapper implements [`Encoder`] only if the inner codec does, and
/// [`Decoder`] only if the inner codec does. Wrapping a decode-only decoder
/// therefore yields a decode-only decoder, which is how compressed legacy
/// archives are read.
///
/// Decoding swallows every failure: a corrupt or truncated gzip stream, or an
/// inner decode failure, is `None`.
///
/// # Example
///
/// ```
/// use filebuffer_codec::{CborCodec, Decoder, Encoder, GzipCodec};
///
/// let codec = GzipCodec::new(CborCodec::<String>::new(), true);
/// let bytes = codec.encode(&"compressed".to_string()).unwrap();
/// assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
/// let decoded: Option<String> = codec.decode(&bytes);
/// assert_eq!(decoded.as_deref(), Some("compressed"));
/// ```
#[derive(Debug, Clone)]
pub struct GzipCodec<C> {
    inner: C,
    compressing: bool,
}

impl<C> GzipCodec<C> {
    /// Wraps `inner`; payloads are gzip streams when `compressing` is true.
    #[must_use]
    pub const fn new(inner: C, compressing: bool) -> Self {
        Self { inner, compressing }
    }

    /// Returns whether payloads are compressed.
    #[must_use]
    pub const fn is_compressing(&self) -> bool {
        self.compressing
    }

    /// Switches compression on or off.
    pub fn set_compressing(&mut self, compressing: bool) {
        self.compressing = compressing;
    }

    /// Returns the wrapped codec.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn inflate<'a>(&self, bytes: &'a [u8]) -> CodecResult<Cow<'a, [u8]>> {
        if !self.compressing {
            return Ok(Cow::Borrowed(bytes));
        }
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CodecError::compression(e.to_string()))?;
        Ok(Cow::Owned(out))
    }

    fn deflate(&self, payload: Vec<u8>) -> CodecResult<Vec<u8>> {
        if !self.compressing {
            return Ok(payload);
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&payload)
            .map_err(|e| CodecError::compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CodecError::compression(e.to_string()))
    }
}

impl<T, C: Encoder<T>> Encoder<T> for GzipCodec<C> {
    fn encode(&self, value: &T) -> CodecResult<Vec<u8>> {
        let payload = self.inner.encode(value)?;
        self.deflate(payload)
    }
}

impl<T, C: Decoder<T>> Decoder<T> for GzipCodec<C> {
    fn decode(&self, bytes: &[u8]) -> Option<T> {
        let payload = self.inflate(bytes).ok()?;
        self.inner.decode(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CborCodec;

    /// Decode-only stand-in for a legacy text format.
    struct LinesDecoder;

    impl Decoder<Vec<String>> for LinesDecoder {
        fn decode(&self, bytes: &[u8]) -> Option<Vec<String>> {
            let text = std::str::from_utf8(bytes).ok()?;
            Some(text.lines().map(str::to_owned).collect())
        }
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn uncompressed_passthrough() {
        let codec = GzipCodec::new(CborCodec::<u32>::new(), false);
        let bytes = codec.encode(&7u32).unwrap();
        assert_eq!(bytes, CborCodec::<u32>::new().encode(&7).unwrap());
        let decoded: Option<u32> = codec.decode(&bytes);
        assert_eq!(decoded, Some(7));
    }

    #[test]
    fn compressed_roundtrip() {
        let codec = GzipCodec::new(CborCodec::<String>::new(), true);
        let value = "abc".repeat(200);
        let bytes = codec.encode(&value).unwrap();
        assert!(bytes.len() < value.len());
        let decoded: Option<String> = codec.decode(&bytes);
        assert_eq!(decoded, Some(value));
    }

    #[test]
    fn decode_only_legacy_reader() {
        let decoder = GzipCodec::new(LinesDecoder, true);
        let payload = gzip(b"first\nsecond\n");
        let decoded: Option<Vec<String>> = decoder.decode(&payload);
        assert_eq!(
            decoded,
            Some(vec!["first".to_string(), "second".to_string()])
        );
    }

    #[test]
    fn corrupt_stream_is_none() {
        let decoder = GzipCodec::new(LinesDecoder, true);
        let decoded: Option<Vec<String>> = decoder.decode(b"definitely not gzip");
        assert_eq!(decoded, None);

        let payload = gzip(b"first\nsecond\n");
        let decoded: Option<Vec<String>> = decoder.decode(&payload[..payload.len() / 2]);
        assert_eq!(decoded, None);
    }

    #[test]
    fn inner_failure_is_none() {
        let decoder = GzipCodec::new(LinesDecoder, true);
        let decoded: Option<Vec<String>> = decoder.decode(&gzip(&[0xff, 0xfe, 0xfd]));
        assert_eq!(decoded, None);
    }

    #[test]
    fn toggle_compression() {
        let mut codec = GzipCodec::new(CborCodec::<u8>::new(), false);
        assert!(!codec.is_compressing());
        codec.set_compressing(true);
        assert!(codec.is_compressing());
        let bytes = codec.encode(&1u8).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }
}
