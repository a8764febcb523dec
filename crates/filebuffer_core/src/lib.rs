//! # filebuffer core
//!
//! A persistent, append-only, randomly indexable record store backed by
//! two files:
//!
//! - a **data file**: a header (magic value plus optional metadata) followed
//!   by length-prefixed records, each the encoded form of one element
//! - an **index file**: one big-endian 8-byte offset per record
//!
//! The number of elements is always derived from the index file's length.
//!
//! ## Failure policy
//!
//! | When | What happens |
//! |------|--------------|
//! | open finds data and index disagreeing | `InconsistentState` error |
//! | a read hits any problem | `None` |
//! | a write finds a file deleted or shrunk | both files recreated, then write |
//!
//! ## Usage
//!
//! ```rust
//! use filebuffer_codec::CborCodec;
//! use filebuffer_core::{IndexedFileBuffer, Metadata};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let metadata = Metadata::from([("source".to_string(), "app".to_string())]);
//! let buffer = IndexedFileBuffer::open(
//!     0x4C_4F_47_31,
//!     Some(metadata.clone()),
//!     CborCodec::<String>::new(),
//!     dir.path().join("events"),
//!     dir.path().join("events.index"),
//! )
//! .unwrap();
//!
//! buffer.add_all(&["a".to_string(), "b".to_string()]).unwrap();
//! assert_eq!(buffer.len(), 2);
//! assert_eq!(buffer.get(1).as_deref(), Some("b"));
//! assert_eq!(buffer.get(2), None);
//! assert_eq!(buffer.metadata(), Some(&metadata));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod data;
mod error;
mod header;
mod index;
mod iter;
mod processor;

pub use buffer::{BufferBuilder, ElementProcessors, IndexedFileBuffer, INDEX_EXTENSION};
pub use config::BufferConfig;
pub use data::{DataFile, RECORD_PREFIX_SIZE};
pub use error::{BufferError, BufferResult, ProcessorError};
pub use header::{Header, Metadata};
pub use index::{IndexFile, INDEX_ENTRY_SIZE};
pub use iter::Iter;
pub use processor::{ElementCounter, ElementProcessor};

pub use filebuffer_codec::{CborCodec, Codec, CodecError, Decoder, Encoder};
#[cfg(feature = "gzip")]
pub use filebuffer_codec::GzipCodec;
