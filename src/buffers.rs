//! Draw buffer lifecycle
//!
//! Two equally sized, DMA capable, cache-line aligned buffers the graphics
//! display renders into while the previous one is still being pushed to the
//! panel. They are a fraction of a full frame: the canvas is rendered in
//! stripes.
use core::alloc::Layout;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

/// Alignment of draw buffers, one cache line
pub const FRAME_BUFFER_ALIGN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("buffer size is zero or not representable")]
    InvalidLayout,
    #[error("out of DMA capable memory for {size} bytes")]
    AllocationFailed { size: usize },
}

/// Source of DMA capable memory.
///
/// # Safety
///
/// `allocate_zeroed` must return memory that is valid for `layout.size()` bytes,
/// aligned to `layout.align()`, zero filled and not aliased, until it is handed
/// back to `deallocate`.
pub unsafe trait DmaAllocator: Clone {
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` came from `allocate_zeroed` of this allocator with the same `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global allocator. Host builds have no DMA, any memory will do.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDmaAllocator;

unsafe impl DmaAllocator for SystemDmaAllocator {
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: callers never pass a zero sized layout, see `FrameBuffer::new`
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout);
    }
}

/// One draw buffer, exclusively owned
pub struct FrameBuffer<A: DmaAllocator> {
    ptr: NonNull<u8>,
    layout: Layout,
    alloc: A,
}

impl<A: DmaAllocator> FrameBuffer<A> {
    pub fn new(alloc: A, size: usize) -> Result<Self, AllocError> {
        if size == 0 {
            return Err(AllocError::InvalidLayout);
        }
        let layout = Layout::from_size_align(size, FRAME_BUFFER_ALIGN)
            .map_err(|_| AllocError::InvalidLayout)?;
        let ptr = alloc
            .allocate_zeroed(layout)
            .ok_or(AllocError::AllocationFailed { size })?;
        debug_assert_eq!(ptr.as_ptr() as usize % FRAME_BUFFER_ALIGN, 0);

        Ok(FrameBuffer { ptr, layout, alloc })
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }
}

impl<A: DmaAllocator> Deref for FrameBuffer<A> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: valid, initialized and unaliased for layout.size() bytes per
        // the allocator contract
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl<A: DmaAllocator> DerefMut for FrameBuffer<A> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: see Deref, and &mut self guarantees exclusivity
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl<A: DmaAllocator> Drop for FrameBuffer<A> {
    fn drop(&mut self) {
        // SAFETY: allocated by this allocator with this layout in `new`
        unsafe { self.alloc.deallocate(self.ptr, self.layout) }
    }
}

impl<A: DmaAllocator> core::fmt::Debug for FrameBuffer<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.layout.size())
            .finish()
    }
}

// Plain owned memory, nothing thread bound about it
unsafe impl<A: DmaAllocator + Send> Send for FrameBuffer<A> {}

/// The double buffer pair
#[derive(Debug)]
pub struct FrameBuffers<A: DmaAllocator> {
    pub buf1: FrameBuffer<A>,
    pub buf2: FrameBuffer<A>,
}

impl<A: DmaAllocator> FrameBuffers<A> {
    pub fn len(&self) -> usize {
        self.buf1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf1.is_empty()
    }
}

/// Bytes of one draw buffer: `width * height * bytes_per_pixel / buffer_factor`
pub fn frame_buffer_len(
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
    buffer_factor: usize,
) -> Option<usize> {
    if buffer_factor == 0 {
        return None;
    }
    width
        .checked_mul(height)?
        .checked_mul(bytes_per_pixel)
        .map(|bytes| bytes / buffer_factor)
}

/// Allocate both draw buffers. Either both are returned or none: if the second
/// allocation fails the first one is released again.
pub fn allocate_frame_buffers<A: DmaAllocator>(
    alloc: &A,
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
    buffer_factor: usize,
) -> Result<FrameBuffers<A>, AllocError> {
    let size = frame_buffer_len(width, height, bytes_per_pixel, buffer_factor)
        .ok_or(AllocError::InvalidLayout)?;

    let allocate = |name: &str| {
        FrameBuffer::new(alloc.clone(), size).map_err(|e| {
            log::error!("Failed to allocate draw buffer {} ({} bytes): {}", name, size, e);
            e
        })
    };
    let buf1 = allocate("buf1")?;
    let buf2 = allocate("buf2")?;

    log::info!(
        "Allocated 2 draw buffers of {} bytes ({}x{}x{} / {})",
        size,
        width,
        height,
        bytes_per_pixel,
        buffer_factor
    );
    Ok(FrameBuffers { buf1, buf2 })
}
