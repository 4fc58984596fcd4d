use core::alloc::Layout;
use core::ffi::c_void;
use core::ptr::NonNull;

use esp_idf_svc::sys::*;

use crate::buffers::DmaAllocator;

/// DMA capable internal RAM from the ESP-IDF heap
#[derive(Debug, Clone, Copy, Default)]
pub struct EspDmaAllocator;

unsafe impl DmaAllocator for EspDmaAllocator {
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        let ptr = unsafe {
            heap_caps_aligned_calloc(layout.align(), 1, layout.size(), MALLOC_CAP_DMA)
        };
        if ptr.is_null() {
            log::error!(
                "heap_caps_aligned_calloc({}, {}) failed, largest DMA block {} bytes",
                layout.align(),
                layout.size(),
                unsafe { heap_caps_get_largest_free_block(MALLOC_CAP_DMA) }
            );
        }
        NonNull::new(ptr as *mut u8)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        heap_caps_free(ptr.as_ptr() as *mut c_void);
    }
}
