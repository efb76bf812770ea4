#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod addr;
pub mod barrier;
pub mod cache;
pub mod clock;
pub mod delay;
pub mod dma_pool;
pub mod mmio;
pub mod net;
pub mod paging;
