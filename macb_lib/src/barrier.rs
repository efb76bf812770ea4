//! Memory barriers for the descriptor hand-off between the CPU and a DMA
//! engine.
//!
//! The controller observes descriptor memory asynchronously, so every
//! transfer of ownership must be fenced: a producer barrier before the
//! cache flush that publishes a descriptor, a consumer barrier after the
//! invalidate that precedes reading device-written status.

use core::sync::atomic::{fence, Ordering};

/// Producer memory barrier - ensures all stores before the barrier complete
/// before any stores after the barrier.
#[inline(always)]
pub fn membar_producer() {
    fence(Ordering::Release);
}

/// Consumer memory barrier - ensures all loads before the barrier complete
/// before any loads after the barrier.
#[inline(always)]
pub fn membar_consumer() {
    fence(Ordering::Acquire);
}

/// Full memory synchronization barrier.
#[inline(always)]
pub fn membar_sync() {
    fence(Ordering::SeqCst);
}
