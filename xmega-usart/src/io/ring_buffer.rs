//! Byte queue between a USART interrupt handler and the main loop.
//!
//! Each [`SerialPort`](crate::usart::SerialPort) owns two of these. On the
//! receive side the RXC handler is the only writer and application reads
//! are the only reader; on the transmit side the roles swap. Nothing else
//! is shared, so no critical section is needed: the two sides communicate
//! only through the `write` and `read` cursors, and each cursor has exactly
//! one context that stores to it.
//!
//! # Usage rules
//!
//! - [`push`](RingBuffer::push) is called from one context only.
//! - [`pop`](RingBuffer::pop) and [`top`](RingBuffer::top) are called from
//!   one (other) context only.
//! - Either side may interrupt the other at any instruction.
//!
//! Breaking the first two rules is a data race.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Circular queue of `N` slots, of which `N - 1` can be occupied.
///
/// Keeping one slot unused means `write == read` can only mean "empty",
/// so the cursors alone describe the state and no count has to be shared.
///
/// `N` must be at least 2. `T` crosses between contexts and so must be
/// `Send`; the driver only ever stores `u8`.
pub struct RingBuffer<T, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    /// Slot the next `push` fills. Stored by the writer only.
    write: AtomicUsize,
    /// Slot the next `pop` empties. Stored by the reader only.
    read: AtomicUsize,
}

// SAFETY: slots in [read, write) belong to the reader and the rest to the
// writer. A slot changes hands only through a Release store of a cursor
// that the other side loads with Acquire.
unsafe impl<T: Send, const N: usize> Sync for RingBuffer<T, N> {}
unsafe impl<T: Send, const N: usize> Send for RingBuffer<T, N> {}

impl<T, const N: usize> RingBuffer<T, N> {
    /// Empty buffer, usable in a `static` initialiser.
    ///
    /// # Panics
    ///
    /// If `N < 2`. In const context this is a build error.
    pub const fn new() -> Self {
        assert!(N >= 2, "ring buffer needs at least 2 slots (1 usable)");

        RingBuffer {
            // SAFETY: uninitialised `MaybeUninit` elements are valid values.
            slots: unsafe { MaybeUninit::<[UnsafeCell<MaybeUninit<T>>; N]>::uninit().assume_init() },
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    /// Slot after `cursor`, wrapping at `N`.
    #[inline]
    const fn next(cursor: usize) -> usize {
        if cursor + 1 == N {
            0
        } else {
            cursor + 1
        }
    }

    #[inline]
    fn slot(&self, cursor: usize) -> *mut MaybeUninit<T> {
        self.slots[cursor].get()
    }

    /// Writer side: queue `value`.
    ///
    /// A full buffer hands `value` back as `Err` and is left as it was.
    pub fn push(&self, value: T) -> Result<(), T> {
        let write = self.write.load(Ordering::Relaxed);
        let after = Self::next(write);
        if after == self.read.load(Ordering::Acquire) {
            return Err(value);
        }

        // SAFETY: `write` is outside [read, write) and so owned by us.
        unsafe { (*self.slot(write)).write(value) };
        self.write.store(after, Ordering::Release);
        Ok(())
    }

    /// Reader side: take the oldest value.
    ///
    /// On an empty buffer returns `None` and leaves both cursors alone.
    pub fn pop(&self) -> Option<T> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: `read` is inside [read, write), published by the writer.
        let value = unsafe { (*self.slot(read)).assume_init_read() };
        self.read.store(Self::next(read), Ordering::Release);
        Some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when a [`push`](Self::push) would be refused.
    pub fn is_full(&self) -> bool {
        self.len() == N - 1
    }

    /// Occupied slots.
    pub fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        if write >= read {
            write - read
        } else {
            N - read + write
        }
    }

    /// Most values held at once, `N - 1`.
    pub const fn capacity(&self) -> usize {
        N - 1
    }
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    /// Reader side: the oldest value, left in place.
    pub fn top(&self) -> Option<T> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: as in `pop`; `T: Copy` so reading leaves the slot valid.
        Some(unsafe { (*self.slot(read)).assume_init_read() })
    }
}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Drop for RingBuffer<T, N> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
