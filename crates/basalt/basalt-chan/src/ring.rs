//! Circular message ring over raw shared memory.
//!
//! A `Ring` is a view of one queue region inside a channel block: the
//! [`QueueHeader`] at its base, then `capacity` fixed-size slots. Both ends
//! of a mapping build a `Ring` over the same bytes and drive it through the
//! header atomics, so all state lives in the shared region; the `Ring`
//! itself only carries the base pointer, the geometry, and the producer
//! lock.
//!
//! # Concurrency contract
//!
//! - Producers serialize on the per-ring mutex while reserving a slot
//!   (reading `tail`, testing for full, publishing the new `tail`). The
//!   payload copy happens after the lock is dropped: a reserved slot index
//!   is producer-exclusive until the consumer advances `head` past it.
//! - The consumer side takes no lock; one logical consumer per ring is
//!   assumed. A second consumer needs its own serialization on top.
//! - `QueueFull` and `QueueEmpty` are returned immediately, never awaited.

use crate::error::ChanError;
use crate::wire::{HEADER_BYTES, QueueHeader};
use std::ptr::NonNull;
use std::sync::atomic::Ordering;
use std::sync::{Mutex, PoisonError};

pub struct Ring {
    base: NonNull<u8>,
    capacity: u32,
    slot_size: usize,
    producer: Mutex<()>,
}

// The ring only dereferences memory inside the shared block its owner keeps
// alive, and mutation of the header goes through atomics under the locking
// contract above.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    /// Build a ring over freshly allocated memory, zeroing the header and
    /// every slot.
    ///
    /// # Safety
    /// `base` must point to at least `HEADER_BYTES + capacity * slot_size`
    /// bytes of writable memory, 4-byte aligned, exclusively owned by the
    /// caller for the duration of the call, and outliving the `Ring`.
    pub unsafe fn init_at(base: NonNull<u8>, capacity: u32, slot_size: usize) -> Ring {
        debug_assert!(capacity > 1, "a ring needs the sacrificial slot");
        // SAFETY: the caller guarantees the region is writable and sized
        // for the header plus all slots.
        unsafe {
            base.as_ptr()
                .write_bytes(0, HEADER_BYTES + capacity as usize * slot_size);
        }
        Ring {
            base,
            capacity,
            slot_size,
            producer: Mutex::new(()),
        }
    }

    /// Adopt an already-initialized region, e.g. the client side of a
    /// mapping.
    ///
    /// # Safety
    /// Same region requirements as [`Ring::init_at`], except the header and
    /// slots must already have been initialized by the other side with the
    /// same `capacity` and `slot_size`.
    pub unsafe fn from_raw(base: NonNull<u8>, capacity: u32, slot_size: usize) -> Ring {
        debug_assert!(capacity > 1);
        Ring {
            base,
            capacity,
            slot_size,
            producer: Mutex::new(()),
        }
    }

    #[inline]
    fn header(&self) -> &QueueHeader {
        // SAFETY: base points at a valid QueueHeader for the life of self.
        unsafe { &*(self.base.as_ptr() as *const QueueHeader) }
    }

    #[inline]
    fn slot_ptr(&self, index: u32) -> *mut u8 {
        debug_assert!(index < self.capacity);
        // SAFETY: index is in [0, capacity), so the slot lies inside the
        // region promised at construction.
        unsafe {
            self.base
                .as_ptr()
                .add(HEADER_BYTES + index as usize * self.slot_size)
        }
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Messages currently enqueued. At most `capacity - 1`.
    pub fn len(&self) -> u32 {
        let head = self.header().head.load(Ordering::Acquire) % self.capacity;
        let tail = self.header().tail.load(Ordering::Acquire) % self.capacity;
        (tail + self.capacity - head) % self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity - 1
    }

    /// Reserve the next producer slot, or fail with `QueueFull` leaving
    /// `tail` untouched.
    fn reserve(&self) -> Result<u32, ChanError> {
        let _guard = self
            .producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let hdr = self.header();
        let tail = hdr.tail.load(Ordering::Relaxed) % self.capacity;
        let head = hdr.head.load(Ordering::Acquire) % self.capacity;
        let next = (tail + 1) % self.capacity;
        if next == head {
            return Err(ChanError::QueueFull);
        }

        hdr.tail.store(next, Ordering::Release);
        Ok(tail)
    }

    fn fill_slot(&self, index: u32, body: &[u8]) {
        debug_assert!(body.len() <= self.slot_size);
        // SAFETY: the slot at `index` was just reserved, so no other
        // producer can touch it and the consumer has not reached it yet.
        unsafe {
            let dst = self.slot_ptr(index);
            std::ptr::copy_nonoverlapping(body.as_ptr(), dst, body.len());
            dst.add(body.len()).write_bytes(0, self.slot_size - body.len());
        }
    }

    /// Enqueue a raw payload, copied verbatim into the reserved slot (the
    /// remainder of the slot is zero-filled). Returns the slot index.
    pub fn enqueue(&self, payload: &[u8]) -> Result<u32, ChanError> {
        if payload.is_empty() {
            return Err(ChanError::InvalidArgument("empty payload"));
        }
        if payload.len() > self.slot_size {
            return Err(ChanError::PayloadTooLarge {
                len: payload.len(),
                slot: self.slot_size,
            });
        }

        let index = self.reserve()?;
        self.fill_slot(index, payload);
        Ok(index)
    }

    /// Enqueue a text payload: one trailing line terminator is stripped and
    /// the stored content is always NUL-terminated.
    pub fn enqueue_text(&self, payload: &str) -> Result<u32, ChanError> {
        if payload.is_empty() {
            return Err(ChanError::InvalidArgument("empty payload"));
        }
        let body = payload.as_bytes();
        let body = match body.last() {
            Some(b'\n') => &body[..body.len() - 1],
            _ => body,
        };
        // +1 for the terminator.
        if body.len() + 1 > self.slot_size {
            return Err(ChanError::PayloadTooLarge {
                len: body.len() + 1,
                slot: self.slot_size,
            });
        }

        let index = self.reserve()?;
        self.fill_slot(index, body);
        Ok(index)
    }

    fn consume_index(&self) -> Result<u32, ChanError> {
        let hdr = self.header();
        let head = hdr.head.load(Ordering::Relaxed) % self.capacity;
        let tail = hdr.tail.load(Ordering::Acquire) % self.capacity;
        if head == tail {
            return Err(ChanError::QueueEmpty);
        }
        Ok(head)
    }

    #[inline]
    fn advance_head(&self, head: u32) {
        self.header()
            .head
            .store((head + 1) % self.capacity, Ordering::Release);
    }

    /// Dequeue the slot at `head` verbatim, as `slot_size` bytes.
    pub fn dequeue(&self) -> Result<Vec<u8>, ChanError> {
        let head = self.consume_index()?;
        let mut out = vec![0u8; self.slot_size];
        // SAFETY: the slot stays valid until we advance head below; the
        // copy completes first.
        unsafe {
            std::ptr::copy_nonoverlapping(self.slot_ptr(head), out.as_mut_ptr(), self.slot_size);
        }
        self.advance_head(head);
        Ok(out)
    }

    /// Dequeue a text payload: content up to the NUL terminator, with one
    /// trailing line terminator stripped if present.
    pub fn dequeue_text(&self) -> Result<String, ChanError> {
        let head = self.consume_index()?;
        // SAFETY: same bounds as dequeue; the bytes are copied out before
        // head advances.
        let slot = unsafe {
            std::slice::from_raw_parts(self.slot_ptr(head) as *const u8, self.slot_size)
        };
        let end = slot.iter().position(|&b| b == 0).unwrap_or(self.slot_size);
        let mut bytes = slot[..end].to_vec();
        self.advance_head(head);

        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }
        String::from_utf8(bytes).map_err(|_| ChanError::InvalidArgument("slot is not valid utf-8"))
    }
}
