//! Data file: header followed by length-prefixed records.

use crate::error::{BufferError, BufferResult};
use crate::header::Header;
use filebuffer_storage::StorageBackend;

/// Size of the record length prefix in bytes.
pub const RECORD_PREFIX_SIZE: u64 = 4;

/// Append-only data file.
///
/// Each record is framed as `[i32 len][payload]`, big-endian. Records are
/// never rewritten in place.
#[derive(Debug)]
pub struct DataFile<B> {
    backend: B,
}

impl<B: StorageBackend> DataFile<B> {
    /// Wraps a backend holding a data file.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Size in bytes, as tracked by this instance.
    pub fn len(&self) -> BufferResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Whether the data file holds no bytes at all, not even a header.
    pub fn is_empty(&self) -> BufferResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Size in bytes currently visible at the backing location, `None` if
    /// the data file is gone.
    pub fn persisted_len(&self) -> BufferResult<Option<u64>> {
        Ok(self.backend.persisted_len()?)
    }

    /// Writes `header` into an empty data file.
    ///
    /// Returns the header length, which is the offset of the first record.
    ///
    /// # Errors
    ///
    /// Fails with [`BufferError::InconsistentState`] if the file is not empty.
    pub fn write_header(&mut self, header: &Header) -> BufferResult<u64> {
        let size = self.backend.size()?;
        if size != 0 {
            return Err(BufferError::inconsistent_state(format!(
                "header must go into an empty data file, found {size} bytes"
            )));
        }
        let bytes = header.encode()?;
        self.backend.append(&bytes)?;
        Ok(bytes.len() as u64)
    }

    /// Reads the header at the start of the file.
    ///
    /// Returns the header and its length.
    pub fn read_header(&self) -> BufferResult<(Header, u64)> {
        Header::read_from(&self.backend)
    }

    /// Appends one record, returning the offset of its length prefix.
    pub fn append_record(&mut self, payload: &[u8]) -> BufferResult<u64> {
        let offsets = self.append_records(&[payload])?;
        Ok(offsets[0])
    }

    /// Appends several records with one write.
    ///
    /// Returns the offset of every record's length prefix, in order.
    pub fn append_records<P: AsRef<[u8]>>(&mut self, payloads: &[P]) -> BufferResult<Vec<u64>> {
        let start = self.backend.size()?;
        let total: usize = payloads
            .iter()
            .map(|p| p.as_ref().len() + RECORD_PREFIX_SIZE as usize)
            .sum();

        let mut buf = Vec::with_capacity(total);
        let mut offsets = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let payload = payload.as_ref();
            let len = i32::try_from(payload.len()).map_err(|_| {
                BufferError::invalid_argument(format!("record too large: {} bytes", payload.len()))
            })?;
            offsets.push(start + buf.len() as u64);
            buf.extend_from_slice(&len.to_be_bytes());
            buf.extend_from_slice(payload);
        }

        self.backend.append(&buf)?;
        Ok(offsets)
    }

    /// Reads the payload of the record whose length prefix starts at `offset`.
    pub fn read_record(&self, offset: u64) -> BufferResult<Vec<u8>> {
        let len = self.record_len(offset)?;
        Ok(self.backend.read_at(offset + RECORD_PREFIX_SIZE, len)?)
    }

    /// Offset just past the record whose length prefix starts at `offset`,
    /// judged from the prefix alone.
    pub fn record_end(&self, offset: u64) -> BufferResult<u64> {
        let len = self.record_len(offset)?;
        Ok(offset + RECORD_PREFIX_SIZE + len as u64)
    }

    fn record_len(&self, offset: u64) -> BufferResult<usize> {
        let prefix = self.backend.read_at(offset, RECORD_PREFIX_SIZE as usize)?;
        let len = i32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        usize::try_from(len).map_err(|_| {
            BufferError::invalid_format(format!("negative record length {len} at offset {offset}"))
        })
    }

    /// Truncates the file to `len` bytes.
    pub fn truncate(&mut self, len: u64) -> BufferResult<()> {
        self.backend.truncate(len)?;
        Ok(())
    }

    /// Drops the backing file and starts over with an empty one.
    ///
    /// The caller is responsible for writing a header afterwards.
    pub fn recreate(&mut self) -> BufferResult<()> {
        self.backend.recreate()?;
        Ok(())
    }

    /// Syncs the data file to disk.
    pub fn sync(&mut self) -> BufferResult<()> {
        self.backend.sync()?;
        Ok(())
    }
}
