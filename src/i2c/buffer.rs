// Licensed under the Apache-2.0 license

//! Fixed-capacity byte buffers shared between the interrupt handler and the
//! foreground.
//!
//! Every cell is an atomic so a buffer can sit in a `static` and be touched from
//! both contexts through a shared reference. Ownership is still handed back and
//! forth by the bus state: the foreground only writes a buffer while the bus is
//! READY, the interrupt handler only while a transaction is in flight.

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

/// The buffer had no room left; the byte was dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferFull;

pub struct ByteBuffer<const N: usize> {
    data: [AtomicU8; N],
    len: AtomicUsize,
    cursor: AtomicUsize,
}

impl<const N: usize> Default for ByteBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteBuffer<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [const { AtomicU8::new(0) }; N],
            len: AtomicUsize::new(0),
            cursor: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Append a byte at the current length.
    ///
    /// # Errors
    ///
    /// `BufferFull` when the buffer is at capacity. Nothing is stored.
    pub fn write(&self, byte: u8) -> Result<(), BufferFull> {
        let len = self.len.load(Ordering::Acquire);
        let slot = self.data.get(len).ok_or(BufferFull)?;
        slot.store(byte, Ordering::Relaxed);
        self.len.store(len + 1, Ordering::Release);
        Ok(())
    }

    /// Next unread byte, or `0` once everything written has been read.
    pub fn read(&self) -> u8 {
        let cursor = self.cursor.load(Ordering::Acquire);
        if cursor >= self.len() {
            return 0;
        }
        let byte = self
            .data
            .get(cursor)
            .map_or(0, |slot| slot.load(Ordering::Relaxed));
        self.cursor.store(cursor + 1, Ordering::Release);
        byte
    }

    pub fn reset(&self) {
        self.cursor.store(0, Ordering::Release);
        self.len.store(0, Ordering::Release);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire).min(N)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// Bytes written but not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.len()
            .saturating_sub(self.cursor.load(Ordering::Acquire))
    }

    /// Copy of everything written so far, independent of the read cursor.
    #[must_use]
    pub fn snapshot(&self) -> heapless::Vec<u8, N> {
        self.data
            .iter()
            .take(self.len())
            .map(|slot| slot.load(Ordering::Relaxed))
            .collect()
    }
}
