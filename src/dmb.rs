use std::sync::atomic::compiler_fence;
use std::sync::atomic::Ordering;

#[cfg(uio_cdma_has_dmb)]
#[link(name = "dmb")]
extern "C" {
    fn __dmb();
}

/// Full-system data memory barrier.
///
/// Orders CPU writes to the reserved DDR window against the register write
/// that hands the window to the DMA engine. DMB is ARM-only, so other archs
/// only get the compiler fence.
#[inline(always)]
pub fn dmb() {
    compiler_fence(Ordering::SeqCst);
    #[cfg(uio_cdma_has_dmb)]
    unsafe {
        __dmb();
    }
    compiler_fence(Ordering::SeqCst);
}
