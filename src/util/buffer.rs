//! Aligned read buffers
//!
//! O_DIRECT reads require the destination buffer to be aligned to the device's
//! logical block size. The measurement loop allocates one of these per call and
//! reuses it for every block.

use std::alloc::{alloc_zeroed, dealloc, Layout};

/// Default alignment; covers 512e and 4Kn devices
pub const DEFAULT_ALIGNMENT: usize = 4096;

/// Memory-aligned buffer suitable for O_DIRECT operations
pub struct AlignedBuffer {
    ptr: *mut u8,
    size: usize,
    layout: Layout,
}

impl AlignedBuffer {
    /// Create a new zeroed buffer with the specified size and alignment
    ///
    /// Returns `None` when the size is zero, the alignment is not a power of two,
    /// or the allocation fails.
    pub fn new(size: usize, alignment: usize) -> Option<Self> {
        if size == 0 || !alignment.is_power_of_two() {
            return None;
        }

        let layout = Layout::from_size_align(size, alignment).ok()?;

        // SAFETY: layout has a non-zero size
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return None;
        }

        Some(AlignedBuffer { ptr, size, layout })
    }

    /// Get the buffer as a slice
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is a live allocation of `size` initialized bytes
        unsafe { std::slice::from_raw_parts(self.ptr, self.size) }
    }

    /// Get the buffer as a mutable slice
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr is a live allocation of `size` initialized bytes, uniquely borrowed
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.size) }
    }

    #[inline(always)]
    pub fn is_aligned(&self) -> bool {
        (self.ptr as usize) % self.layout.align() == 0
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with this exact layout
        unsafe {
            dealloc(self.ptr, self.layout);
        }
    }
}

// AlignedBuffer is Send because it owns its memory
unsafe impl Send for AlignedBuffer {}
