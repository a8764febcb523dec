//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level byte store backing one of the buffer's two files.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `size` is the offset the next `append` will write at
/// - after `recreate`, `size` is zero and `persisted_len` is `Some(0)`
///
/// # Implementors
///
/// - [`super::FileBackend`] - for persistent storage
/// - [`super::InMemoryBackend`] - for testing
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read would extend beyond the current size
    /// or an I/O error occurs.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes pending writes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the size this backend believes it holds, in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Truncates the storage to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` is greater than the current size
    /// or the truncation fails.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Returns the length currently visible at the backing location.
    ///
    /// `None` means the backing location no longer exists. A value smaller
    /// than [`StorageBackend::size`] means it was truncated externally.
    ///
    /// # Errors
    ///
    /// Returns an error if the location exists but cannot be inspected.
    fn persisted_len(&self) -> StorageResult<Option<u64>>;

    /// Discards the current contents and rebinds to a fresh, empty store
    /// at the same location.
    ///
    /// # Errors
    ///
    /// Returns an error if the fresh store cannot be created.
    fn recreate(&mut self) -> StorageResult<()>;
}
