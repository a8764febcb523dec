//! Buffer configuration.

/// Configuration for opening a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Whether to sync both files to disk after every write.
    pub sync_on_write: bool,

    /// Whether reopening with a magic value different from the persisted
    /// one is an error. When disabled the persisted header is trusted.
    pub verify_magic: bool,

    /// Whether missing parent directories are created, both at open time
    /// and when self-heal recreates a file.
    pub create_dirs: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            sync_on_write: false,
            verify_magic: true,
            create_dirs: true,
        }
    }
}

impl BufferConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to sync after every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets whether a magic value mismatch on reopen is an error.
    #[must_use]
    pub const fn verify_magic(mut self, value: bool) -> Self {
        self.verify_magic = value;
        self
    }

    /// Sets whether missing parent directories are created.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }
}
