//! Data file header: magic value plus optional metadata.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! [i32 magic]
//! [u8  has_metadata: 0 | 1]
//!   if 1: [i32 entry_count]
//!         entry_count x ([i32 key_len][key utf-8][i32 value_len][value utf-8])
//! ```
//!
//! The header is written once, at offset zero, before any record.

use crate::error::{BufferError, BufferResult};
use filebuffer_storage::{StorageBackend, StorageError};
use std::collections::BTreeMap;

/// Metadata stored in the header.
pub type Metadata = BTreeMap<String, String>;

const NO_METADATA: u8 = 0;
const HAS_METADATA: u8 = 1;

/// The header of a data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Identifies the logical format of the file pair.
    pub magic_value: i32,
    /// Optional metadata. `None` and an empty map are distinct states.
    pub metadata: Option<Metadata>,
}

impl Header {
    /// Creates a header.
    #[must_use]
    pub fn new(magic_value: i32, metadata: Option<Metadata>) -> Self {
        Self {
            magic_value,
            metadata,
        }
    }

    /// Encodes the header to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata holds more entries, or longer
    /// strings, than an `i32` length can describe.
    pub fn encode(&self) -> BufferResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.magic_value.to_be_bytes());

        match &self.metadata {
            None => buf.push(NO_METADATA),
            Some(metadata) => {
                buf.push(HAS_METADATA);
                buf.extend_from_slice(&encode_len(metadata.len(), "metadata entry count")?);
                for (key, value) in metadata {
                    put_string(&mut buf, key, "metadata key")?;
                    put_string(&mut buf, value, "metadata value")?;
                }
            }
        }

        Ok(buf)
    }

    /// Reads a header from the start of `backend`.
    ///
    /// Returns the header and its encoded length, which is the offset of the
    /// first record.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidFormat`] if the header is truncated or
    /// malformed.
    pub fn read_from<B: StorageBackend>(backend: &B) -> BufferResult<(Self, u64)> {
        let mut cursor = HeaderCursor { backend, pos: 0 };

        let magic_value = cursor.read_i32()?;
        let metadata = match cursor.read_u8()? {
            NO_METADATA => None,
            HAS_METADATA => {
                let count = cursor.read_len("metadata entry count")?;
                let mut metadata = Metadata::new();
                for _ in 0..count {
                    let key = cursor.read_string("metadata key")?;
                    let value = cursor.read_string("metadata value")?;
                    metadata.insert(key, value);
                }
                Some(metadata)
            }
            flag => {
                return Err(BufferError::invalid_format(format!(
                    "invalid metadata flag {flag}"
                )))
            }
        };

        Ok((Self::new(magic_value, metadata), cursor.pos))
    }
}

fn encode_len(len: usize, what: &str) -> BufferResult<[u8; 4]> {
    let len = i32::try_from(len)
        .map_err(|_| BufferError::invalid_argument(format!("{what} too large: {len}")))?;
    Ok(len.to_be_bytes())
}

fn put_string(buf: &mut Vec<u8>, s: &str, what: &str) -> BufferResult<()> {
    buf.extend_from_slice(&encode_len(s.len(), what)?);
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

struct HeaderCursor<'a, B> {
    backend: &'a B,
    pos: u64,
}

impl<B: StorageBackend> HeaderCursor<'_, B> {
    fn read_bytes(&mut self, len: usize) -> BufferResult<Vec<u8>> {
        let bytes = self.backend.read_at(self.pos, len).map_err(|e| match e {
            StorageError::ReadPastEnd { .. } => BufferError::invalid_format("header truncated"),
            other => other.into(),
        })?;
        self.pos += len as u64;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> BufferResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_i32(&mut self) -> BufferResult<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_len(&mut self, what: &str) -> BufferResult<usize> {
        let len = self.read_i32()?;
        usize::try_from(len)
            .map_err(|_| BufferError::invalid_format(format!("negative {what}: {len}")))
    }

    fn read_string(&mut self, what: &str) -> BufferResult<String> {
        let len = self.read_len(what)?;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes)
            .map_err(|_| BufferError::invalid_format(format!("{what} is not valid UTF-8")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filebuffer_storage::InMemoryBackend;

    fn metadata() -> Metadata {
        Metadata::from([
            ("foo1".to_string(), "bar1".to_string()),
            ("foo2".to_string(), "bar2".to_string()),
        ])
    }

    fn decode(bytes: Vec<u8>) -> BufferResult<(Header, u64)> {
        Header::read_from(&InMemoryBackend::with_data(bytes))
    }

    #[test]
    fn header_without_metadata_layout() {
        let header = Header::new(0xDEAD_BEEF_u32 as i32, None);
        let bytes = header.encode().unwrap();
        assert_eq!(bytes, vec![0xDE, 0xAD, 0xBE, 0xEF, 0]);

        let (decoded, len) = decode(bytes).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(len, 5);
    }

    #[test]
    fn header_with_metadata_layout() {
        let header = Header::new(7, Some(Metadata::from([("k".into(), "vv".into())])));
        let bytes = header.encode().unwrap();
        assert_eq!(
            bytes,
            vec![0, 0, 0, 7, 1, 0, 0, 0, 1, 0, 0, 0, 1, b'k', 0, 0, 0, 2, b'v', b'v']
        );
    }

    #[test]
    fn metadata_roundtrip() {
        let header = Header::new(-1, Some(metadata()));
        let bytes = header.encode().unwrap();
        let expected_len = bytes.len() as u64;

        let (decoded, len) = decode(bytes).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(len, expected_len);
    }

    #[test]
    fn empty_metadata_is_not_absent() {
        let header = Header::new(1, Some(Metadata::new()));
        let (decoded, _) = decode(header.encode().unwrap()).unwrap();
        assert_eq!(decoded.metadata, Some(Metadata::new()));
    }

    #[test]
    fn header_followed_by_records_reads_only_header() {
        let header = Header::new(3, Some(metadata()));
        let mut bytes = header.encode().unwrap();
        let header_len = bytes.len() as u64;
        bytes.extend_from_slice(&[0, 0, 0, 2, 0xAA, 0xBB]);

        let (decoded, len) = decode(bytes).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(len, header_len);
    }

    #[test]
    fn truncated_header_is_invalid_format() {
        let bytes = Header::new(3, Some(metadata())).encode().unwrap();
        for cut in [0, 3, 5, 9, bytes.len() - 1] {
            let result = decode(bytes[..cut].to_vec());
            assert!(
                matches!(result, Err(BufferError::InvalidFormat { .. })),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn bad_flag_is_invalid_format() {
        let result = decode(vec![0, 0, 0, 1, 2]);
        assert!(matches!(result, Err(BufferError::InvalidFormat { .. })));
    }

    #[test]
    fn negative_count_is_invalid_format() {
        let result = decode(vec![0, 0, 0, 1, 1, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(BufferError::InvalidFormat { .. })));
    }

    #[test]
    fn invalid_utf8_is_invalid_format() {
        let result = decode(vec![0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0xFF, 0, 0, 0, 0]);
        assert!(matches!(result, Err(BufferError::InvalidFormat { .. })));
    }
}
