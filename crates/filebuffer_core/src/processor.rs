//! Element processors: observers notified of every added element.

use crate::error::ProcessorError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Observer invoked with every element successfully added to a buffer.
///
/// Processors run after the element is persisted and while the buffer's
/// lock is held, so they see elements in add order. They cannot change what
/// was stored. Returning an error makes the `add`/`add_all` call that
/// triggered it fail with [`crate::BufferError::Processor`]; the element is
/// still stored, and processors after the failing one are not called.
///
/// # Reentrancy
///
/// The buffer's lock is reentrant and processors are invoked from a
/// snapshot of the registered list. A processor may therefore call back
/// into the buffer that notified it: read with `len`, `get` or `iter`,
/// replace the processors, or even `add`. A nested `add` notifies the
/// current processors again, recursively, before the outer call returns.
/// Other threads block on the buffer until the outermost call finishes.
pub trait ElementProcessor<T>: Send + Sync {
    /// Called once for an element added with `add`.
    fn process_element(&self, element: &T) -> Result<(), ProcessorError>;

    /// Called once for a batch added with `add_all`.
    ///
    /// Defaults to calling [`ElementProcessor::process_element`] for each
    /// element.
    fn process_elements(&self, elements: &[T]) -> Result<(), ProcessorError> {
        elements.iter().try_for_each(|e| self.process_element(e))
    }
}

/// Processor that counts added elements.
#[derive(Debug, Default)]
pub struct ElementCounter {
    count: AtomicU64,
}

impl ElementCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements seen so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl<T> ElementProcessor<T> for ElementCounter {
    fn process_element(&self, _element: &T) -> Result<(), ProcessorError> {
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn process_elements(&self, elements: &[T]) -> Result<(), ProcessorError> {
        self.count.fetch_add(elements.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}
