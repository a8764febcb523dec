//! Shared helpers for the benchmarks.

#![warn(missing_docs)]

use filebuffer_codec::CborCodec;
use filebuffer_core::IndexedFileBuffer;
use rand::Rng;
use tempfile::TempDir;

/// Buffer type used by the benchmarks.
pub type BenchBuffer = IndexedFileBuffer<Vec<u8>, CborCodec<Vec<u8>>>;

/// Magic value used by the benchmarks.
pub const BENCH_MAGIC: i32 = 0x4245_4E43;

/// Generate random element data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` random elements of `size` bytes each.
pub fn random_elements(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count).map(|_| random_data(size)).collect()
}

/// Opens a fresh buffer in a temporary directory.
///
/// The directory is returned so it outlives the buffer.
pub fn temp_buffer() -> (TempDir, BenchBuffer) {
    let dir = TempDir::new().expect("failed to create temp directory");
    let buffer = IndexedFileBuffer::open(
        BENCH_MAGIC,
        None,
        CborCodec::new(),
        dir.path().join("bench"),
        dir.path().join("bench.index"),
    )
    .expect("failed to open buffer");
    (dir, buffer)
}
