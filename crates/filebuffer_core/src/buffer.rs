//! The indexed file buffer.

use crate::config::BufferConfig;
use crate::data::DataFile;
use crate::error::{BufferError, BufferResult, ProcessorError};
use crate::header::{Header, Metadata};
use crate::index::{IndexFile, INDEX_ENTRY_SIZE};
use crate::iter::Iter;
use crate::processor::ElementProcessor;
use filebuffer_codec::{Decoder, Encoder};
use filebuffer_storage::{FileBackend, StorageBackend};
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::ffi::OsString;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Extension appended to a data file path by [`BufferBuilder::file_pair`].
pub const INDEX_EXTENSION: &str = "index";

/// Shared list of element processors.
pub type ElementProcessors<T> = Vec<Arc<dyn ElementProcessor<T>>>;

/// A persistent, append-only, randomly indexable sequence of elements.
///
/// Elements are encoded with a codec `C` and stored as length-prefixed
/// records in a data file. A separate index file holds one 8-byte offset per
/// record, so `get(i)` costs two positioned reads regardless of how many
/// elements are stored.
///
/// # Failure policy
///
/// - Opening is strict: a file pair whose index and data disagree fails
///   with [`BufferError::InconsistentState`] instead of dropping records.
/// - Reads are soft: any failure while reading an element yields `None`.
/// - Writes self-heal: if either file was deleted or truncated behind this
///   instance's back, both are recreated (header included) and the buffer
///   starts over from zero elements before the write proceeds.
///
/// # Thread Safety
///
/// One lock guards both files. All operations take `&self`, so a buffer
/// can be shared across threads behind an `Arc`. The lock is reentrant:
/// element processors run while it is held and may call back into the
/// same buffer from the notifying thread.
///
/// # Example
///
/// ```no_run
/// use filebuffer_codec::CborCodec;
/// use filebuffer_core::IndexedFileBuffer;
///
/// let buffer = IndexedFileBuffer::open(
///     0x0BAD_CAFE,
///     None,
///     CborCodec::<String>::new(),
///     "events.bin",
///     "events.bin.index",
/// )?;
/// buffer.add(&"hello".to_string())?;
/// assert_eq!(buffer.get(0).as_deref(), Some("hello"));
/// # Ok::<(), filebuffer_core::BufferError>(())
/// ```
pub struct IndexedFileBuffer<T, C> {
    codec: C,
    header: Header,
    config: BufferConfig,
    data_path: PathBuf,
    index_path: PathBuf,
    files: ReentrantMutex<RefCell<Files>>,
    processors: RwLock<ElementProcessors<T>>,
}

/// Both files plus the header length, guarded together.
///
/// The sizes the backends track are this instance's view of what is on
/// disk; comparing them with what the paths actually show is how external
/// damage is detected.
struct Files<B = FileBackend> {
    data: DataFile<B>,
    index: IndexFile<B>,
    header_len: u64,
}

/// Outcome of fetching one element.
pub(crate) enum Fetch<T> {
    /// Position is at or beyond the current size.
    OutOfRange,
    /// Position is in range but the element could not be read or decoded.
    Unreadable,
    /// The decoded element.
    Element(T),
}

impl<T, C> IndexedFileBuffer<T, C> {
    /// Opens or creates a buffer with the default configuration.
    ///
    /// See [`IndexedFileBuffer::open_with_config`].
    pub fn open(
        magic_value: i32,
        metadata: Option<Metadata>,
        codec: C,
        data_path: impl AsRef<Path>,
        index_path: impl AsRef<Path>,
    ) -> BufferResult<Self> {
        Self::open_with_config(
            magic_value,
            metadata,
            codec,
            data_path,
            index_path,
            BufferConfig::default(),
        )
    }

    /// Opens or creates a buffer.
    ///
    /// If the data file is missing or empty, a fresh header holding
    /// `magic_value` and `metadata` is written and both files start at zero
    /// elements. Otherwise the persisted header is authoritative: `metadata`
    /// is ignored, and `magic_value` must match unless
    /// [`BufferConfig::verify_magic`] is off.
    ///
    /// # Errors
    ///
    /// - [`BufferError::InvalidArgument`] for empty or identical paths
    /// - [`BufferError::InconsistentState`] if the existing files disagree,
    ///   e.g. records in the data file but an empty index
    /// - [`BufferError::MagicMismatch`] if the persisted magic differs
    /// - [`BufferError::InvalidFormat`] if the header is malformed
    pub fn open_with_config(
        magic_value: i32,
        metadata: Option<Metadata>,
        codec: C,
        data_path: impl AsRef<Path>,
        index_path: impl AsRef<Path>,
        config: BufferConfig,
    ) -> BufferResult<Self> {
        let data_path = data_path.as_ref();
        let index_path = index_path.as_ref();
        validate_paths(data_path, index_path)?;

        let open = |path: &Path| {
            if config.create_dirs {
                FileBackend::open_with_create_dirs(path)
            } else {
                FileBackend::open(path)
            }
        };
        let mut data = DataFile::new(open(data_path)?);
        let mut index = IndexFile::new(open(index_path)?);

        let index_bytes = index.byte_len()?;
        if index_bytes % INDEX_ENTRY_SIZE != 0 {
            return Err(BufferError::inconsistent_state(format!(
                "index file {} is {index_bytes} bytes, not a multiple of {INDEX_ENTRY_SIZE}",
                index_path.display()
            )));
        }

        let (header, header_len) = if data.is_empty()? {
            let header = Header::new(magic_value, metadata);
            let header_len = start_fresh(&mut data, &mut index, &header)?;
            if config.sync_on_write {
                data.sync()?;
                index.sync()?;
            }
            debug!(data = %data_path.display(), magic = magic_value, "created buffer");
            (header, header_len)
        } else {
            let (header, header_len) = data.read_header()?;
            check_header(&header, magic_value, metadata.as_ref(), &config)?;
            check_consistency(&data, &index, header_len)?;
            let elements = index.len()?;
            debug!(
                data = %data_path.display(),
                magic = header.magic_value,
                elements,
                "opened buffer"
            );
            (header, header_len)
        };

        Ok(Self {
            codec,
            header,
            config,
            data_path: data_path.to_path_buf(),
            index_path: index_path.to_path_buf(),
            files: ReentrantMutex::new(RefCell::new(Files {
                data,
                index,
                header_len,
            })),
            processors: RwLock::new(Vec::new()),
        })
    }

    /// Magic value from the data file header.
    #[must_use]
    pub fn magic_value(&self) -> i32 {
        self.header.magic_value
    }

    /// Metadata from the data file header.
    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.header.metadata.as_ref()
    }

    /// The configuration this buffer was opened with.
    #[must_use]
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Path of the data file.
    #[must_use]
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Path of the index file.
    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Number of elements, derived from the index file's current length.
    ///
    /// Reflects external changes to the index file; a missing index file
    /// counts as empty.
    #[must_use]
    pub fn len(&self) -> u64 {
        let guard = self.files.lock();
        let len = guard.borrow().index.persisted_len();
        match len {
            Ok(len) => len,
            Err(e) => {
                warn!(index = %self.index_path.display(), error = %e, "cannot stat index file");
                0
            }
        }
    }

    /// Whether the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the full set of element processors.
    pub fn set_element_processors(&self, processors: ElementProcessors<T>) {
        *self.processors.write() = processors;
    }

    /// Returns the current element processors.
    #[must_use]
    pub fn element_processors(&self) -> ElementProcessors<T> {
        self.processors.read().clone()
    }

    /// Removes every element, keeping the header.
    ///
    /// After a reset the next element is stored at index 0, right after the
    /// header.
    pub fn reset(&self) -> BufferResult<()> {
        let guard = self.files.lock();
        let mut files = guard.borrow_mut();
        if !self.heal(&mut files)? {
            let header_len = files.header_len;
            files.data.truncate(header_len)?;
            files.index.truncate_to(0)?;
        }
        if self.config.sync_on_write {
            files.sync()?;
        }
        debug!(data = %self.data_path.display(), "buffer reset");
        Ok(())
    }

    /// Syncs both files to disk.
    pub fn flush(&self) -> BufferResult<()> {
        let guard = self.files.lock();
        let mut files = guard.borrow_mut();
        files.sync()
    }

    /// Recreates both files if either was deleted or shrunk externally.
    ///
    /// Returns whether a recovery happened.
    fn heal(&self, files: &mut Files) -> BufferResult<bool> {
        let data_expected = files.data.len()?;
        let data_ok = matches!(files.data.persisted_len()?, Some(len) if len >= data_expected);
        let index_expected = files.index.byte_len()?;
        let index_ok =
            matches!(files.index.persisted_byte_len()?, Some(len) if len >= index_expected);
        if data_ok && index_ok {
            return Ok(false);
        }

        warn!(
            data = %self.data_path.display(),
            index = %self.index_path.display(),
            data_ok,
            index_ok,
            "buffer files damaged externally, starting over"
        );
        files.data.recreate()?;
        files.index.recreate()?;
        files.header_len = files.data.write_header(&self.header)?;
        Ok(true)
    }

    /// Runs `call` against a snapshot of the processors. The caller holds
    /// the files lock but no `RefCell` borrow of it.
    fn notify<F>(&self, call: F) -> BufferResult<()>
    where
        F: Fn(&dyn ElementProcessor<T>) -> Result<(), ProcessorError>,
    {
        let processors = self.element_processors();
        for processor in &processors {
            call(processor.as_ref()).map_err(BufferError::Processor)?;
        }
        Ok(())
    }
}

impl<T, C: Encoder<T>> IndexedFileBuffer<T, C> {
    /// Appends one element.
    ///
    /// If either file was damaged externally since the last write, the
    /// buffer first starts over from an empty store (see the type docs).
    ///
    /// # Errors
    ///
    /// Fails if the element cannot be encoded, on I/O errors (in which case
    /// nothing is left behind), or if an element processor fails (in which
    /// case the element is stored).
    pub fn add(&self, element: &T) -> BufferResult<()> {
        let payload = self.codec.encode(element)?;

        let guard = self.files.lock();
        {
            let mut files = guard.borrow_mut();
            self.heal(&mut files)?;
            files.append(&[payload], self.config.sync_on_write)?;
        }
        self.notify(|p| p.process_element(element))
    }

    /// Appends a batch of elements.
    ///
    /// All elements are encoded before anything is written; an encoding
    /// failure leaves the buffer untouched. Processors receive the whole
    /// batch once.
    ///
    /// # Errors
    ///
    /// Same as [`IndexedFileBuffer::add`].
    pub fn add_all(&self, elements: &[T]) -> BufferResult<()> {
        if elements.is_empty() {
            return Ok(());
        }
        let payloads = elements
            .iter()
            .map(|e| self.codec.encode(e))
            .collect::<Result<Vec<_>, _>>()?;

        let guard = self.files.lock();
        {
            let mut files = guard.borrow_mut();
            self.heal(&mut files)?;
            files.append(&payloads, self.config.sync_on_write)?;
        }
        self.notify(|p| p.process_elements(elements))
    }
}

impl<T, C: Decoder<T>> IndexedFileBuffer<T, C> {
    /// Returns the element at `index`, or `None` if it is out of range or
    /// cannot be read.
    ///
    /// Never fails and never triggers recovery.
    #[must_use]
    pub fn get(&self, index: u64) -> Option<T> {
        match self.fetch(index) {
            Fetch::Element(element) => Some(element),
            Fetch::OutOfRange | Fetch::Unreadable => None,
        }
    }

    /// Returns a forward iterator over the elements.
    ///
    /// The iterator re-checks the current size on every step, so elements
    /// added during iteration are visible and a concurrent reset ends it.
    /// Elements that cannot be read are skipped.
    pub fn iter(&self) -> Iter<'_, T, C> {
        Iter::new(self)
    }

    pub(crate) fn fetch(&self, index: u64) -> Fetch<T> {
        let payload = {
            let guard = self.files.lock();
            let payload = guard.borrow().read_payload(index);
            match payload {
                Ok(Some(payload)) => payload,
                Ok(None) => return Fetch::OutOfRange,
                Err(e) => {
                    warn!(index, error = %e, "failed to read element");
                    return Fetch::Unreadable;
                }
            }
        };

        match self.codec.decode(&payload) {
            Some(element) => Fetch::Element(element),
            None => {
                warn!(index, len = payload.len(), "failed to decode element");
                Fetch::Unreadable
            }
        }
    }
}

impl<'a, T, C: Decoder<T>> IntoIterator for &'a IndexedFileBuffer<T, C> {
    type Item = T;
    type IntoIter = Iter<'a, T, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, C: fmt::Debug> fmt::Debug for IndexedFileBuffer<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedFileBuffer")
            .field("codec", &self.codec)
            .field("header", &self.header)
            .field("data_path", &self.data_path)
            .field("index_path", &self.index_path)
            .field("processors", &self.processors.read().len())
            .finish_non_exhaustive()
    }
}

impl<B: StorageBackend> Files<B> {
    /// Writes records and their index entries, rolling both files back if
    /// any step fails.
    fn append(&mut self, payloads: &[Vec<u8>], sync: bool) -> BufferResult<()> {
        let data_mark = self.data.len()?;
        let index_mark = self.index.len()?;

        let result = self.write_records(payloads, sync);
        if let Err(e) = &result {
            warn!(error = %e, records = payloads.len(), "write failed, rolling back");
            if let Err(rollback) = self.data.truncate(data_mark) {
                warn!(error = %rollback, "failed to roll back data file");
            }
            if let Err(rollback) = self.index.truncate_to(index_mark) {
                warn!(error = %rollback, "failed to roll back index file");
            }
        }
        result
    }

    fn write_records(&mut self, payloads: &[Vec<u8>], sync: bool) -> BufferResult<()> {
        let offsets = self.data.append_records(payloads)?;
        self.index.append_all(&offsets)?;
        if sync {
            self.sync()?;
        }
        Ok(())
    }

    /// Reads the raw payload of element `index`; `None` if out of range.
    fn read_payload(&self, index: u64) -> BufferResult<Option<Vec<u8>>> {
        if index >= self.index.persisted_len()? {
            return Ok(None);
        }
        if self.data.persisted_len()?.is_none() {
            return Err(BufferError::inconsistent_state("data file is missing"));
        }

        let offset = self.index.offset_at(index)?;
        if offset < self.header_len {
            return Err(BufferError::invalid_format(format!(
                "offset {offset} of element {index} points into the header"
            )));
        }
        trace!(index, offset, "reading element");
        Ok(Some(self.data.read_record(offset)?))
    }

    fn sync(&mut self) -> BufferResult<()> {
        self.data.sync()?;
        self.index.sync()
    }
}

fn validate_paths(data_path: &Path, index_path: &Path) -> BufferResult<()> {
    if data_path.as_os_str().is_empty() {
        return Err(BufferError::invalid_argument("data file path is empty"));
    }
    if index_path.as_os_str().is_empty() {
        return Err(BufferError::invalid_argument("index file path is empty"));
    }
    if data_path == index_path {
        return Err(BufferError::invalid_argument(format!(
            "data and index file must differ, both are {}",
            data_path.display()
        )));
    }
    Ok(())
}

/// Writes a fresh header into an empty data file, then drops any index
/// entries left over from a previous data file.
///
/// Returns the header length. The index is only touched once the header is
/// written.
fn start_fresh<B: StorageBackend>(
    data: &mut DataFile<B>,
    index: &mut IndexFile<B>,
    header: &Header,
) -> BufferResult<u64> {
    let header_len = data.write_header(header)?;
    let entries = index.len()?;
    if entries != 0 {
        warn!(entries, "data file is empty, discarding index entries");
        index.truncate_to(0)?;
    }
    Ok(header_len)
}

fn check_header(
    header: &Header,
    magic_value: i32,
    metadata: Option<&Metadata>,
    config: &BufferConfig,
) -> BufferResult<()> {
    if header.magic_value != magic_value {
        if config.verify_magic {
            return Err(BufferError::MagicMismatch {
                expected: magic_value,
                found: header.magic_value,
            });
        }
        warn!(
            expected = magic_value,
            found = header.magic_value,
            "magic value mismatch, trusting persisted header"
        );
    }
    if metadata.is_some() && metadata != header.metadata.as_ref() {
        debug!("ignoring supplied metadata, persisted header wins");
    }
    Ok(())
}

fn check_consistency<B: StorageBackend>(
    data: &DataFile<B>,
    index: &IndexFile<B>,
    header_len: u64,
) -> BufferResult<()> {
    let data_len = data.len()?;
    let entries = index.len()?;

    if entries == 0 {
        if data_len > header_len {
            return Err(BufferError::inconsistent_state(format!(
                "index is empty but data file holds {} bytes of records",
                data_len - header_len
            )));
        }
        return Ok(());
    }

    let last = index.offset_at(entries - 1)?;
    if last < header_len || last >= data_len {
        return Err(BufferError::inconsistent_state(format!(
            "last index entry points at {last}, records span {header_len}..{data_len}"
        )));
    }

    // The last indexed record must end exactly where the data file ends.
    let end = data.record_end(last).map_err(|e| {
        BufferError::inconsistent_state(format!("last indexed record at {last} is unreadable: {e}"))
    })?;
    if end != data_len {
        return Err(BufferError::inconsistent_state(format!(
            "index covers {entries} records ending at {end}, data file is {data_len} bytes"
        )));
    }
    Ok(())
}

/// Builder for [`IndexedFileBuffer`] that reports missing inputs as
/// [`BufferError::InvalidArgument`].
///
/// # Example
///
/// ```no_run
/// use filebuffer_codec::CborCodec;
/// use filebuffer_core::{BufferBuilder, BufferConfig};
///
/// let buffer = BufferBuilder::new()
///     .magic_value(0x0BAD_CAFE)
///     .codec(CborCodec::<u64>::new())
///     .file_pair("/var/lib/app/events")
///     .config(BufferConfig::new().sync_on_write(true))
///     .open()?;
/// buffer.add(&7)?;
/// # Ok::<(), filebuffer_core::BufferError>(())
/// ```
pub struct BufferBuilder<T, C> {
    magic_value: Option<i32>,
    metadata: Option<Metadata>,
    codec: Option<C>,
    data_path: Option<PathBuf>,
    index_path: Option<PathBuf>,
    config: BufferConfig,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> Default for BufferBuilder<T, C> {
    fn default() -> Self {
        Self {
            magic_value: None,
            metadata: None,
            codec: None,
            data_path: None,
            index_path: None,
            config: BufferConfig::default(),
            _marker: PhantomData,
        }
    }
}

impl<T, C> BufferBuilder<T, C> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the magic value. Mandatory.
    #[must_use]
    pub fn magic_value(mut self, magic_value: i32) -> Self {
        self.magic_value = Some(magic_value);
        self
    }

    /// Sets the metadata written into a fresh header.
    #[must_use]
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the codec. Mandatory.
    #[must_use]
    pub fn codec(mut self, codec: C) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Sets the data file path. Mandatory.
    #[must_use]
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Sets the index file path. Mandatory.
    #[must_use]
    pub fn index_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Uses `path` as data file and `path` plus an `.index` extension as
    /// index file.
    #[must_use]
    pub fn file_pair(self, path: impl Into<PathBuf>) -> Self {
        let data_path = path.into();
        let mut index_name = OsString::from(data_path.as_os_str());
        index_name.push(".");
        index_name.push(INDEX_EXTENSION);
        self.index_file(index_name).data_file(data_path)
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: BufferConfig) -> Self {
        self.config = config;
        self
    }

    /// Opens the buffer.
    ///
    /// # Errors
    ///
    /// Fails with [`BufferError::InvalidArgument`] if the magic value, the
    /// codec or either path was not set, otherwise as
    /// [`IndexedFileBuffer::open_with_config`].
    pub fn open(self) -> BufferResult<IndexedFileBuffer<T, C>> {
        let magic_value = self
            .magic_value
            .ok_or_else(|| BufferError::invalid_argument("magic value is required"))?;
        let codec = self
            .codec
            .ok_or_else(|| BufferError::invalid_argument("codec is required"))?;
        let data_path = self
            .data_path
            .ok_or_else(|| BufferError::invalid_argument("data file path is required"))?;
        let index_path = self
            .index_path
            .ok_or_else(|| BufferError::invalid_argument("index file path is required"))?;

        IndexedFileBuffer::open_with_config(
            magic_value,
            self.metadata,
            codec,
            data_path,
            index_path,
            self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filebuffer_codec::CborCodec;
    use filebuffer_storage::{InMemoryBackend, StorageError, StorageResult};
    use std::fs;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::{tempdir, TempDir};

    const MAGIC: i32 = 0x1234_5678;

    fn open(dir: &TempDir) -> IndexedFileBuffer<String, CborCodec<String>> {
        IndexedFileBuffer::open(
            MAGIC,
            None,
            CborCodec::new(),
            dir.path().join("dump"),
            dir.path().join("dump.index"),
        )
        .unwrap()
    }

    #[test]
    fn fresh_buffer_has_header_only() {
        let dir = tempdir().unwrap();
        let buffer = open(&dir);

        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert_eq!(fs::read(dir.path().join("dump")).unwrap(), vec![0x12, 0x34, 0x56, 0x78, 0]);
        assert_eq!(fs::metadata(dir.path().join("dump.index")).unwrap().len(), 0);
    }

    #[test]
    fn first_record_follows_header() {
        let dir = tempdir().unwrap();
        let buffer = open(&dir);
        buffer.add(&"x".to_string()).unwrap();

        let index = fs::read(dir.path().join("dump.index")).unwrap();
        assert_eq!(index, 5i64.to_be_bytes());
    }

    #[test]
    fn identical_paths_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("same");
        let result =
            IndexedFileBuffer::<String, _>::open(MAGIC, None, CborCodec::<String>::new(), &path, &path);
        assert!(matches!(result, Err(BufferError::InvalidArgument { .. })));
    }

    #[test]
    fn empty_path_rejected() {
        let dir = tempdir().unwrap();
        let result = IndexedFileBuffer::<String, _>::open(
            MAGIC,
            None,
            CborCodec::<String>::new(),
            "",
            dir.path().join("i"),
        );
        assert!(matches!(result, Err(BufferError::InvalidArgument { .. })));
    }

    #[test]
    fn builder_requires_magic_and_codec() {
        let dir = tempdir().unwrap();

        let result = BufferBuilder::<String, CborCodec<String>>::new()
            .codec(CborCodec::new())
            .file_pair(dir.path().join("dump"))
            .open();
        assert!(matches!(result, Err(BufferError::InvalidArgument { .. })));

        let result = BufferBuilder::<String, CborCodec<String>>::new()
            .magic_value(MAGIC)
            .file_pair(dir.path().join("dump"))
            .open();
        assert!(matches!(result, Err(BufferError::InvalidArgument { .. })));

        let result = BufferBuilder::<String, CborCodec<String>>::new()
            .magic_value(MAGIC)
            .codec(CborCodec::new())
            .data_file(dir.path().join("dump"))
            .open();
        assert!(matches!(result, Err(BufferError::InvalidArgument { .. })));
    }

    #[test]
    fn builder_file_pair_naming() {
        let dir = tempdir().unwrap();
        let buffer = BufferBuilder::<String, _>::new()
            .magic_value(MAGIC)
            .codec(CborCodec::<String>::new())
            .file_pair(dir.path().join("dump"))
            .open()
            .unwrap();

        assert_eq!(buffer.data_path(), dir.path().join("dump"));
        assert_eq!(buffer.index_path(), dir.path().join("dump.index"));
    }

    #[test]
    fn offset_into_header_is_unreadable() {
        let dir = tempdir().unwrap();
        let buffer = open(&dir);
        buffer.add(&"a".to_string()).unwrap();

        fs::write(dir.path().join("dump.index"), 2i64.to_be_bytes()).unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.get(0), None);
    }

    /// In-memory backend whose appends fail while `fail_appends` is set.
    #[derive(Default)]
    struct FlakyBackend {
        inner: InMemoryBackend,
        fail_appends: Arc<AtomicBool>,
    }

    impl StorageBackend for FlakyBackend {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.inner.read_at(offset, len)
        }

        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            if self.fail_appends.load(Ordering::SeqCst) {
                return Err(StorageError::Io(io::Error::other("disk full")));
            }
            self.inner.append(data)
        }

        fn flush(&mut self) -> StorageResult<()> {
            self.inner.flush()
        }

        fn sync(&mut self) -> StorageResult<()> {
            self.inner.sync()
        }

        fn size(&self) -> StorageResult<u64> {
            self.inner.size()
        }

        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            self.inner.truncate(new_size)
        }

        fn persisted_len(&self) -> StorageResult<Option<u64>> {
            self.inner.persisted_len()
        }

        fn recreate(&mut self) -> StorageResult<()> {
            self.inner.recreate()
        }
    }

    fn encode(value: &str) -> Vec<u8> {
        CborCodec::<String>::new().encode(&value.to_string()).unwrap()
    }

    fn decode(payload: &[u8]) -> Option<String> {
        CborCodec::<String>::new().decode(payload)
    }

    #[test]
    fn failed_index_append_rolls_back_both_files() {
        let index_backend = FlakyBackend::default();
        let index_fails = Arc::clone(&index_backend.fail_appends);
        let mut data = DataFile::new(FlakyBackend::default());
        let mut index = IndexFile::new(index_backend);
        let header_len = start_fresh(&mut data, &mut index, &Header::new(MAGIC, None)).unwrap();
        let mut files = Files {
            data,
            index,
            header_len,
        };

        files.append(&[encode("kept")], false).unwrap();
        let data_len = files.data.len().unwrap();

        index_fails.store(true, Ordering::SeqCst);
        let result = files.append(&[encode("lost"), encode("also lost")], false);
        assert!(matches!(result, Err(BufferError::Storage(_))));
        assert_eq!(files.data.len().unwrap(), data_len);
        assert_eq!(files.data.persisted_len().unwrap(), Some(data_len));
        assert_eq!(files.index.len().unwrap(), 1);

        let payload = files.read_payload(0).unwrap().unwrap();
        assert_eq!(decode(&payload).as_deref(), Some("kept"));
        assert_eq!(files.read_payload(1).unwrap(), None);

        index_fails.store(false, Ordering::SeqCst);
        files.append(&[encode("next")], false).unwrap();
        assert_eq!(files.index.offset_at(1).unwrap(), data_len);
        let payload = files.read_payload(1).unwrap().unwrap();
        assert_eq!(decode(&payload).as_deref(), Some("next"));
    }

    #[test]
    fn failed_data_append_leaves_index_alone() {
        let data_backend = FlakyBackend::default();
        let data_fails = Arc::clone(&data_backend.fail_appends);
        let mut data = DataFile::new(data_backend);
        let mut index = IndexFile::new(FlakyBackend::default());
        let header_len = start_fresh(&mut data, &mut index, &Header::new(MAGIC, None)).unwrap();
        let mut files = Files {
            data,
            index,
            header_len,
        };

        data_fails.store(true, Ordering::SeqCst);
        assert!(files.append(&[encode("lost")], false).is_err());
        assert_eq!(files.data.len().unwrap(), header_len);
        assert_eq!(files.index.len().unwrap(), 0);
    }

    #[test]
    fn failed_header_write_keeps_stale_index() {
        let data_backend = FlakyBackend::default();
        data_backend.fail_appends.store(true, Ordering::SeqCst);
        let mut data = DataFile::new(data_backend);
        let mut index = IndexFile::new(FlakyBackend::default());
        index.append_all(&[5, 12]).unwrap();

        let result = start_fresh(&mut data, &mut index, &Header::new(MAGIC, None));
        assert!(matches!(result, Err(BufferError::Storage(_))));
        assert_eq!(index.len().unwrap(), 2);
    }

    #[test]
    fn fresh_start_discards_stale_index() {
        let mut data = DataFile::new(InMemoryBackend::new());
        let mut index = IndexFile::new(InMemoryBackend::new());
        index.append_all(&[5, 12]).unwrap();

        let header_len = start_fresh(&mut data, &mut index, &Header::new(MAGIC, None)).unwrap();
        assert_eq!(header_len, 5);
        assert_eq!(index.len().unwrap(), 0);
    }
}
