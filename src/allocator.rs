//! A byte-budgeted allocator that issues [`Buffer`]s.
//!
//! The allocator tracks the number of bytes it has handed out against a fixed
//! limit. Requests that would push the running total above the limit are rejected
//! without changing the total. Freeing a buffer returns its bytes to the budget.
//!
//! `RootAllocator` is a cheap handle: clones share the same budget, and the
//! handle may be moved between threads. The check of a request against the limit
//! and the increment of the running total happen under one lock, so concurrent
//! allocations can neither overshoot the limit nor lose updates.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::buffer::{Buffer, Memory};
use crate::error::{Error, Result};

#[derive(Debug)]
struct Inner {
    limit: u64,
    /// Bytes currently handed out. Only changed by `allocate` and `release`.
    allocated: Mutex<u64>,
}

/// A handle to a shared byte budget from which buffers are allocated.
#[derive(Clone, Debug)]
pub struct RootAllocator {
    inner: Arc<Inner>,
}

impl RootAllocator {
    /// An allocator that refuses to hand out more than `limit` bytes at once.
    pub fn new(limit: u64) -> Self {
        Self {
            inner: Arc::new(Inner { limit, allocated: Mutex::new(0) }),
        }
    }

    /// An allocator without a meaningful limit, for convenience and tests.
    pub fn unbounded() -> Self {
        Self::new(u64::MAX)
    }

    /// The maximum number of bytes that may be outstanding.
    pub fn limit(&self) -> u64 {
        self.inner.limit
    }

    /// The number of bytes currently outstanding.
    pub fn allocated(&self) -> u64 {
        *self.inner.allocated.lock()
    }

    /// The number of bytes that may still be allocated.
    pub fn headroom(&self) -> u64 {
        self.inner.limit.saturating_sub(self.allocated())
    }

    /// Allocates a zeroed buffer of exactly `size` bytes.
    ///
    /// Fails with [`Error::OutOfMemory`] when the request does not fit in the remaining
    /// budget, and with [`Error::AllocationFailed`] when the host cannot provide the memory.
    /// In both cases the outstanding total is unchanged.
    pub fn allocate(&self, size: usize) -> Result<Buffer> {
        let requested = size as u64;
        let mut allocated = self.inner.allocated.lock();
        let limit = self.inner.limit;
        if allocated.checked_add(requested).map_or(true, |total| total > limit) {
            debug!(requested, allocated = *allocated, limit, "allocation rejected by budget");
            return Err(Error::OutOfMemory { requested, allocated: *allocated, limit });
        }
        let memory = Memory::zeroed(self.clone(), size)?;
        *allocated += requested;
        trace!(requested, allocated = *allocated, "allocated buffer");
        Ok(Buffer::from_memory(memory))
    }

    /// Returns `buffer`'s bytes to the budget and closes it.
    ///
    /// Freeing a slice, an already freed buffer, or a buffer of another allocator does nothing.
    pub fn free(&self, buffer: &mut Buffer) {
        if !buffer.allocator().same_budget(self) {
            warn!("ignoring free of a buffer owned by another allocator");
            return;
        }
        buffer.close();
    }

    /// Whether `self` and `other` share one budget.
    pub fn same_budget(&self, other: &RootAllocator) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Decrements the outstanding total, never below zero.
    pub(crate) fn release(&self, bytes: u64) {
        let mut allocated = self.inner.allocated.lock();
        if bytes > *allocated {
            warn!(bytes, allocated = *allocated, "release exceeds outstanding bytes; clamping to zero");
        }
        *allocated = allocated.saturating_sub(bytes);
        trace!(released = bytes, allocated = *allocated, "released buffer");
    }
}

impl Default for RootAllocator {
    fn default() -> Self {
        Self::unbounded()
    }
}
