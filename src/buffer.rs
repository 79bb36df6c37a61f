//! Fixed-size blocks of raw memory issued by a [`RootAllocator`].
//!
//! A [`Buffer`] is either the owning handle returned by [`RootAllocator::allocate`],
//! or a slice view created by [`Buffer::slice`] that aliases a sub-range of its
//! parent's memory. Writes through a slice are visible through the parent and
//! every other slice over the same bytes, and vice versa.
//!
//! The backing memory is reference counted, so a slice never outlives the bytes it
//! reads. Budget accounting is separate from the memory's lifetime: only the owning
//! handle returns bytes to the allocator, exactly once, either on [`Buffer::close`]
//! or, failing that, when the last handle to the memory is dropped.
//!
//! Buffers may be moved to another thread but not shared between threads. Handles
//! that alias the same bytes may live on different threads; at most one of them
//! should be mutating a given byte range at a time, and this is not checked.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::allocator::RootAllocator;
use crate::error::{Error, Result};
use crate::simd;

/// Physical allocations are rounded up to, and aligned at, this many bytes.
pub const ALIGNMENT: usize = 16;

/// Memory shared by an owning buffer and its slices.
pub(crate) struct Memory {
    ptr: NonNull<u8>,
    /// `None` for zero-sized allocations, which are never dereferenced.
    layout: Option<Layout>,
    /// The logical size charged against the allocator.
    capacity: usize,
    allocator: RootAllocator,
    released: AtomicBool,
}

impl Memory {
    /// Allocates `capacity` zeroed bytes, rounded up to `ALIGNMENT`.
    pub(crate) fn zeroed(allocator: RootAllocator, capacity: usize) -> Result<Self> {
        let failed = || Error::AllocationFailed { requested: capacity as u64 };
        let physical = capacity.checked_add(ALIGNMENT - 1).ok_or_else(failed)? & !(ALIGNMENT - 1);
        if physical == 0 {
            return Ok(Self { ptr: NonNull::dangling(), layout: None, capacity, allocator, released: AtomicBool::new(false) });
        }
        let layout = Layout::from_size_align(physical, ALIGNMENT).map_err(|_| failed())?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(failed)?;
        Ok(Self { ptr, layout: Some(layout), capacity, allocator, released: AtomicBool::new(false) })
    }

    /// Returns the bytes to the allocator, if not already done.
    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.allocator.release(self.capacity as u64);
        }
    }
}

impl Drop for Memory {
    fn drop(&mut self) {
        self.release();
        if let Some(layout) = self.layout {
            // SAFETY: `ptr` was allocated with exactly this layout and is not referenced elsewhere.
            unsafe { std::alloc::dealloc(self.ptr.as_ptr(), layout) }
        }
    }
}

/// A fixed-capacity, byte-addressable block of memory.
pub struct Buffer {
    memory: Arc<Memory>,
    /// Start of this view within `memory`.
    offset: usize,
    /// Number of addressable bytes; zero once closed.
    length: usize,
    slice: bool,
}

impl Buffer {
    pub(crate) fn from_memory(memory: Memory) -> Self {
        let length = memory.capacity;
        Self { memory: Arc::new(memory), offset: 0, length, slice: false }
    }

    /// The number of addressable bytes.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.length
    }

    /// Whether this buffer is a view into another buffer's memory.
    pub fn is_slice(&self) -> bool {
        self.slice
    }

    /// The allocator whose budget this buffer's memory is charged to.
    pub fn allocator(&self) -> &RootAllocator {
        &self.memory.allocator
    }

    #[inline(always)]
    fn check(&self, index: usize, length: usize) -> Result<()> {
        match index.checked_add(length) {
            Some(end) if end <= self.length => Ok(()),
            _ => Err(Error::out_of_bounds(index, length, self.length)),
        }
    }

    /// Pointer to byte `index` of this view.
    ///
    /// # Safety
    ///
    /// `index` must be at most `self.length`.
    #[inline(always)]
    unsafe fn ptr(&self, index: usize) -> *mut u8 {
        self.memory.ptr.as_ptr().add(self.offset + index)
    }

    #[inline]
    pub fn get_byte(&self, index: usize) -> Result<u8> {
        self.check(index, 1)?;
        // SAFETY: bounds checked above.
        Ok(unsafe { self.ptr(index).read() })
    }

    #[inline]
    pub fn set_byte(&mut self, index: usize, value: u8) -> Result<()> {
        self.check(index, 1)?;
        // SAFETY: bounds checked above.
        unsafe { self.ptr(index).write(value) };
        Ok(())
    }

    /// Reads `N` bytes starting at `index`.
    #[inline]
    pub fn read_array<const N: usize>(&self, index: usize) -> Result<[u8; N]> {
        self.check(index, N)?;
        let mut bytes = [0u8; N];
        // SAFETY: bounds checked above; `bytes` is a distinct local.
        unsafe { std::ptr::copy_nonoverlapping(self.ptr(index), bytes.as_mut_ptr(), N) };
        Ok(bytes)
    }

    /// Writes `N` bytes starting at `index`.
    #[inline]
    pub fn write_array<const N: usize>(&mut self, index: usize, bytes: [u8; N]) -> Result<()> {
        self.check(index, N)?;
        // SAFETY: bounds checked above; `bytes` is a distinct local.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr(index), N) };
        Ok(())
    }

    /// Reads the little-endian 32-bit word at byte offset `index`.
    #[inline]
    pub fn get_int(&self, index: usize) -> Result<i32> {
        self.read_array(index).map(i32::from_le_bytes)
    }

    /// Writes a little-endian 32-bit word at byte offset `index`.
    #[inline]
    pub fn set_int(&mut self, index: usize, value: i32) -> Result<()> {
        self.write_array(index, value.to_le_bytes())
    }

    /// Copies `dst.len()` bytes starting at `index` into `dst`.
    pub fn get_bytes(&self, index: usize, dst: &mut [u8]) -> Result<()> {
        self.check(index, dst.len())?;
        // SAFETY: bounds checked above; `dst` is borrowed mutably so cannot alias our memory.
        unsafe { std::ptr::copy_nonoverlapping(self.ptr(index), dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }

    /// Copies `src[src_offset .. src_offset + length]` to byte offset `index`.
    pub fn set_bytes(&mut self, index: usize, src: &[u8], src_offset: usize, length: usize) -> Result<()> {
        self.check(index, length)?;
        let src = src_offset.checked_add(length)
            .and_then(|end| src.get(src_offset .. end))
            .ok_or_else(|| Error::out_of_bounds(src_offset, length, src.len()))?;
        // SAFETY: bounds checked above; a shared slice cannot alias memory we only reach through raw pointers.
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr(index), length) };
        Ok(())
    }

    /// Copies `length` bytes from `src` at `src_offset` to byte offset `index`.
    ///
    /// The two buffers may be views of the same memory, and the ranges may overlap;
    /// the copy behaves as if made through a temporary.
    pub fn set_bytes_from(&mut self, index: usize, src: &Buffer, src_offset: usize, length: usize) -> Result<()> {
        self.check(index, length)?;
        src.check(src_offset, length)?;
        // SAFETY: both ranges are in bounds, and `copy` permits overlap.
        unsafe { std::ptr::copy(src.ptr(src_offset), self.ptr(index), length) };
        Ok(())
    }

    /// Moves `length` bytes from `src_offset` to `dst_offset` within this buffer.
    pub fn copy_within(&mut self, src_offset: usize, dst_offset: usize, length: usize) -> Result<()> {
        self.check(src_offset, length)?;
        self.check(dst_offset, length)?;
        // SAFETY: both ranges are in bounds, and `copy` permits overlap.
        unsafe { std::ptr::copy(self.ptr(src_offset), self.ptr(dst_offset), length) };
        Ok(())
    }

    /// Sets `length` bytes starting at `index` to `value`.
    pub fn fill(&mut self, index: usize, length: usize, value: u8) -> Result<()> {
        self.check(index, length)?;
        // SAFETY: bounds checked above.
        unsafe { std::ptr::write_bytes(self.ptr(index), value, length) };
        Ok(())
    }

    /// A view of `[offset, offset + length)` that aliases this buffer's memory.
    ///
    /// The view is not charged to the allocator; closing it does nothing.
    pub fn slice(&self, offset: usize, length: usize) -> Result<Buffer> {
        self.check(offset, length)?;
        Ok(Buffer {
            memory: Arc::clone(&self.memory),
            offset: self.offset + offset,
            length,
            slice: true,
        })
    }

    /// Returns the memory to the allocator's budget and empties this handle.
    ///
    /// Closing twice, or closing a slice, only empties the handle. Slices taken
    /// earlier remain readable; their memory is freed when the last one is dropped.
    pub fn close(&mut self) {
        if !self.slice {
            self.memory.release();
        }
        self.length = 0;
    }

    /// Writes `values` as little-endian words at byte offset `index`, in whole SIMD lanes.
    ///
    /// Returns how many leading values were written; the caller handles the rest.
    pub(crate) fn write_i32_lanes(&mut self, index: usize, values: &[i32]) -> Result<usize> {
        self.check(index, values.len() * 4)?;
        // SAFETY: the destination is in bounds for every value, and `values` is a distinct borrow.
        Ok(unsafe { simd::store_i32(self.ptr(index), values) })
    }

    /// Reads little-endian words at byte offset `index` into `values`, in whole SIMD lanes.
    ///
    /// Returns how many leading values were read; the caller handles the rest.
    pub(crate) fn read_i32_lanes(&self, index: usize, values: &mut [i32]) -> Result<usize> {
        self.check(index, values.len() * 4)?;
        // SAFETY: the source is in bounds for every value, and `values` is a distinct borrow.
        Ok(unsafe { simd::load_i32(self.ptr(index), values) })
    }
}

// SAFETY: the reference count and the release flag are atomic, and budget release
// goes through the allocator's lock. Byte access needs `&mut self` for writes, so a
// single handle is never raced; races between aliasing handles are the caller's to avoid.
unsafe impl Send for Buffer { }

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("offset", &self.offset)
            .field("capacity", &self.length)
            .field("slice", &self.slice)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use crate::allocator::RootAllocator;
    use crate::error::Error;

    #[test]
    fn bytes_and_words() {
        let allocator = RootAllocator::unbounded();
        let mut buffer = allocator.allocate(10).unwrap();
        assert_eq!(buffer.get_byte(9), Ok(0));

        buffer.set_int(4, 0x0403_0201).unwrap();
        assert_eq!(buffer.get_byte(4), Ok(1));
        assert_eq!(buffer.get_byte(7), Ok(4));
        assert_eq!(buffer.get_int(4), Ok(0x0403_0201));

        buffer.set_int(6, -1).unwrap();
        assert_eq!(buffer.get_int(6), Ok(-1));
        assert_eq!(buffer.get_int(7), Err(Error::IndexOutOfBounds { index: 7, length: 4, capacity: 10 }));
        assert!(buffer.set_byte(10, 0).is_err());
        assert!(buffer.get_int(usize::MAX).is_err());
    }

    #[test]
    fn bulk_copies() {
        let allocator = RootAllocator::unbounded();
        let mut a = allocator.allocate(8).unwrap();
        a.set_bytes(0, &[1, 2, 3, 4, 5], 1, 4).unwrap();
        let mut out = [0u8; 4];
        a.get_bytes(0, &mut out).unwrap();
        assert_eq!(out, [2, 3, 4, 5]);

        // Source bounds are checked as well as the destination's.
        assert!(a.set_bytes(0, &[1, 2], 1, 2).is_err());
        assert!(a.set_bytes(7, &[1, 2], 0, 2).is_err());

        let mut b = allocator.allocate(8).unwrap();
        b.set_bytes_from(4, &a, 0, 4).unwrap();
        let mut out = [0u8; 8];
        b.get_bytes(0, &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 0, 2, 3, 4, 5]);
        assert!(b.set_bytes_from(6, &a, 0, 4).is_err());
        assert!(b.set_bytes_from(0, &a, 6, 4).is_err());
    }

    #[test]
    fn overlapping_copies() {
        let allocator = RootAllocator::unbounded();
        let mut buffer = allocator.allocate(8).unwrap();
        buffer.set_bytes(0, &[1, 2, 3, 4, 5, 6, 7, 8], 0, 8).unwrap();
        buffer.copy_within(0, 2, 6).unwrap();
        let mut out = [0u8; 8];
        buffer.get_bytes(0, &mut out).unwrap();
        assert_eq!(out, [1, 2, 1, 2, 3, 4, 5, 6]);

        // Same memory reached through a slice behaves the same way.
        let view = buffer.slice(0, 8).unwrap();
        buffer.set_bytes_from(1, &view, 0, 7).unwrap();
        buffer.get_bytes(0, &mut out).unwrap();
        assert_eq!(out, [1, 1, 2, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn slices_alias() {
        let allocator = RootAllocator::unbounded();
        let mut parent = allocator.allocate(16).unwrap();
        let mut slice = parent.slice(4, 8).unwrap();
        assert!(slice.is_slice());
        assert_eq!(slice.capacity(), 8);

        parent.set_int(4, 7).unwrap();
        assert_eq!(slice.get_int(0), Ok(7));
        slice.set_byte(7, 9).unwrap();
        assert_eq!(parent.get_byte(11), Ok(9));

        assert!(slice.get_byte(8).is_err());
        assert!(parent.slice(12, 5).is_err());
        let nested = slice.slice(4, 4).unwrap();
        assert_eq!(nested.get_byte(3), Ok(9));
    }

    #[test]
    fn close_once() {
        let allocator = RootAllocator::unbounded();
        let mut parent = allocator.allocate(16).unwrap();
        parent.fill(0, 16, 0xAB).unwrap();
        let slice = parent.slice(0, 4).unwrap();

        parent.close();
        assert_eq!(allocator.allocated(), 0);
        assert_eq!(parent.capacity(), 0);
        assert!(parent.get_byte(0).is_err());
        parent.close();
        assert_eq!(allocator.allocated(), 0);

        // The slice still reads the memory it was taken over.
        assert_eq!(slice.get_byte(3), Ok(0xAB));
        drop(slice);
        assert_eq!(allocator.allocated(), 0);
    }

    #[test]
    fn moves_between_threads() {
        fn assert_send<T: Send>(_: &T) { }

        let allocator = RootAllocator::unbounded();
        let mut parent = allocator.allocate(8).unwrap();
        parent.set_int(0, 41).unwrap();
        let slice = parent.slice(0, 4).unwrap();
        assert_send(&parent);

        let read = std::thread::spawn(move || slice.get_int(0)).join().unwrap();
        assert_eq!(read, Ok(41));
        std::thread::spawn(move || drop(parent)).join().unwrap();
        assert_eq!(allocator.allocated(), 0);
    }
}
