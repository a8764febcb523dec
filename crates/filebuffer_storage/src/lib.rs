//! # filebuffer storage
//!
//! Byte-store backends underneath the indexed file buffer.
//!
//! Backends are **opaque byte stores**: they know nothing about headers,
//! records or index entries. The buffer owns all format interpretation.
//!
//! Unlike a plain append-only store, a backend can also report whether its
//! backing location was damaged behind its back ([`StorageBackend::persisted_len`])
//! and rebind itself to a fresh, empty location ([`StorageBackend::recreate`]).
//! Those two primitives are what the buffer's self-heal path is built on.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - persistent storage using OS file APIs
//! - [`InMemoryBackend`] - for tests of the file managers
//!
//! ## Example
//!
//! ```rust
//! use filebuffer_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
