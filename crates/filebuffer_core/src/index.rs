//! Index file: one fixed-width offset per record.

use crate::error::{BufferError, BufferResult};
use filebuffer_storage::StorageBackend;

/// Width of one index entry in bytes.
pub const INDEX_ENTRY_SIZE: u64 = 8;

/// Append-only sequence of big-endian `i64` data file offsets.
///
/// Entry `i` is the offset of the length prefix of record `i`.
#[derive(Debug)]
pub struct IndexFile<B> {
    backend: B,
}

impl<B: StorageBackend> IndexFile<B> {
    /// Wraps a backend holding an index.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of entries this instance has written or loaded.
    pub fn len(&self) -> BufferResult<u64> {
        Ok(self.backend.size()? / INDEX_ENTRY_SIZE)
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> BufferResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Size of the index in bytes, as tracked by this instance.
    pub fn byte_len(&self) -> BufferResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Size in bytes currently visible at the backing location, `None` if
    /// the index file is gone.
    pub fn persisted_byte_len(&self) -> BufferResult<Option<u64>> {
        Ok(self.backend.persisted_len()?)
    }

    /// Number of entries currently visible at the backing location.
    ///
    /// A missing file counts as empty.
    pub fn persisted_len(&self) -> BufferResult<u64> {
        Ok(self.persisted_byte_len()?.unwrap_or(0) / INDEX_ENTRY_SIZE)
    }

    /// Reads the offset stored in entry `index`.
    ///
    /// # Errors
    ///
    /// Fails if the entry cannot be read or holds a negative offset.
    pub fn offset_at(&self, index: u64) -> BufferResult<u64> {
        let pos = index
            .checked_mul(INDEX_ENTRY_SIZE)
            .ok_or_else(|| BufferError::invalid_argument(format!("index {index} overflows")))?;
        let bytes = self.backend.read_at(pos, INDEX_ENTRY_SIZE as usize)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes);
        let offset = i64::from_be_bytes(raw);
        u64::try_from(offset).map_err(|_| {
            BufferError::invalid_format(format!("negative offset {offset} in index entry {index}"))
        })
    }

    /// Appends a single entry.
    pub fn append(&mut self, offset: u64) -> BufferResult<()> {
        self.append_all(&[offset])
    }

    /// Appends several entries with one write.
    pub fn append_all(&mut self, offsets: &[u64]) -> BufferResult<()> {
        let mut buf = Vec::with_capacity(offsets.len() * INDEX_ENTRY_SIZE as usize);
        for &offset in offsets {
            let offset = i64::try_from(offset).map_err(|_| {
                BufferError::invalid_argument(format!("offset {offset} does not fit an index entry"))
            })?;
            buf.extend_from_slice(&offset.to_be_bytes());
        }
        self.backend.append(&buf)?;
        Ok(())
    }

    /// Drops every entry from `count` on.
    pub fn truncate_to(&mut self, count: u64) -> BufferResult<()> {
        self.backend.truncate(count * INDEX_ENTRY_SIZE)?;
        Ok(())
    }

    /// Drops the backing file and starts over with an empty one.
    pub fn recreate(&mut self) -> BufferResult<()> {
        self.backend.recreate()?;
        Ok(())
    }

    /// Syncs the index to disk.
    pub fn sync(&mut self) -> BufferResult<()> {
        self.backend.sync()?;
        Ok(())
    }
}
