//! Forward iteration over a buffer.

use crate::buffer::{Fetch, IndexedFileBuffer};
use filebuffer_codec::Decoder;
use std::iter::FusedIterator;
use tracing::debug;

/// Lazy, forward-only iterator over the elements of an [`IndexedFileBuffer`].
///
/// Each step takes the buffer's lock on its own and checks the current size,
/// so there is no snapshot: elements added while iterating are yielded, and
/// a reset ends the iteration early. Elements that cannot be read are
/// skipped. Once exhausted the iterator stays exhausted; call
/// [`IndexedFileBuffer::iter`] again to start over.
pub struct Iter<'a, T, C> {
    buffer: &'a IndexedFileBuffer<T, C>,
    next: u64,
    done: bool,
}

impl<'a, T, C> Iter<'a, T, C> {
    pub(crate) fn new(buffer: &'a IndexedFileBuffer<T, C>) -> Self {
        Self {
            buffer,
            next: 0,
            done: false,
        }
    }

    /// Index of the element the next step will try.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.next
    }
}

impl<T, C: Decoder<T>> Iterator for Iter<'_, T, C> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while !self.done {
            let index = self.next;
            match self.buffer.fetch(index) {
                Fetch::Element(element) => {
                    self.next += 1;
                    return Some(element);
                }
                Fetch::Unreadable => {
                    debug!(index, "skipping unreadable element");
                    self.next += 1;
                }
                Fetch::OutOfRange => self.done = true,
            }
        }
        None
    }
}

impl<T, C: Decoder<T>> FusedIterator for Iter<'_, T, C> {}
