//! Memory pool for DMA.
//!
//! Descriptor rings and packet buffers must live in physically contiguous
//! memory that never moves while the controller holds its address. The
//! platform hands one such region to [`init_dma_pool`] once; allocations
//! are carved out of it with a TLSF allocator and returned page-aligned.

use core::{alloc::Layout, ptr::NonNull};

use rlsf::Tlsf;
use spin::Mutex;

use crate::{
    addr::{phy_addr::PhyAddr, virt_addr::VirtAddr, Addr},
    paging::{self, PAGESIZE},
};

const FLLEN: usize = 24; // The maximum block size is (32 << 24) - 1, nearly 512MiB.
const SLLEN: usize = 64;
type FLBitmap = u32; // must be longer than FLLEN
type SLBitmap = u64; // must be longer than SLLEN

type TLSFAlloc = Tlsf<'static, FLBitmap, SLBitmap, FLLEN, SLLEN>;

static DMA_MEMORY_POOL: Mutex<TLSFAlloc> = Mutex::new(Tlsf::new());

/// Hand a physically contiguous, DMA-capable memory region to the pool.
///
/// # Safety
///
/// `start` must be valid for `size` bytes, mapped, and reachable by the
/// DMA masters that will use it.
pub unsafe fn init_dma_pool(start: VirtAddr, size: usize) {
    let pool = core::slice::from_raw_parts_mut(start.as_mut_ptr::<u8>(), size);

    let Some(pool) = NonNull::new(pool as *mut [u8]) else {
        return;
    };

    let mut guard = DMA_MEMORY_POOL.lock();
    let _ = guard.insert_free_block_ptr(pool);
}

#[derive(Debug)]
pub struct DMAPool<T> {
    virt_addr: VirtAddr,
    phy_addr: PhyAddr,
    size: usize,
    ptr: NonNull<T>,
}

unsafe impl<T: Send> Send for DMAPool<T> {}
unsafe impl<T: Sync> Sync for DMAPool<T> {}

impl<T> DMAPool<T> {
    /// Allocate `pages` pages from the DMA pool. `None` when the pool is
    /// exhausted or was never initialized.
    pub fn new(pages: usize) -> Option<Self> {
        assert!(core::mem::size_of::<T>() <= pages * PAGESIZE);

        let size = pages * PAGESIZE;
        let layout = Layout::from_size_align(size, PAGESIZE).ok()?;

        let pool = {
            let mut allocator = DMA_MEMORY_POOL.lock();
            allocator.allocate(layout)?
        };

        let virt_addr = VirtAddr::new(pool.as_ptr() as usize);
        let phy_addr = paging::vm_to_phy(virt_addr)?;
        let ptr = NonNull::new(pool.as_ptr() as *mut T)?;

        Some(Self {
            virt_addr,
            phy_addr,
            size,
            ptr,
        })
    }

    /// Give the allocation up to the hardware forever.
    pub fn leak(self) -> NonNull<T> {
        let ptr = self.ptr;
        core::mem::forget(self);
        ptr
    }

    /// Wrap an externally provided region.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for `size` bytes for the lifetime of the pool
    /// and must not be freed through any other path.
    pub unsafe fn from_raw_parts(ptr: *mut T, phy_addr: usize, size: usize) -> Option<Self> {
        let virt_addr = VirtAddr::new(ptr as usize);
        let phy_addr = PhyAddr::new(phy_addr);
        let ptr = NonNull::new(ptr)?;

        Some(Self {
            virt_addr,
            phy_addr,
            size,
            ptr,
        })
    }

    #[inline(always)]
    pub fn get_virt_addr(&self) -> VirtAddr {
        self.virt_addr
    }

    #[inline(always)]
    pub fn get_phy_addr(&self) -> PhyAddr {
        self.phy_addr
    }

    #[inline(always)]
    pub fn get_size(&self) -> usize {
        self.size
    }
}

impl<T> AsMut<T> for DMAPool<T> {
    fn as_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> AsRef<T> for DMAPool<T> {
    fn as_ref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> Drop for DMAPool<T> {
    fn drop(&mut self) {
        let ptr = self.virt_addr.as_mut_ptr::<u8>();
        let mut allocator = DMA_MEMORY_POOL.lock();
        unsafe {
            allocator.deallocate(NonNull::new_unchecked(ptr), PAGESIZE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn seed_pool(bytes: usize) {
        // Over-allocate so the region can be aligned to a page boundary.
        let mem = vec![0u8; bytes + PAGESIZE].leak();
        let base = (mem.as_mut_ptr() as usize + PAGESIZE - 1) & !(PAGESIZE - 1);
        unsafe { init_dma_pool(VirtAddr::new(base), bytes) };
    }

    #[test]
    fn allocations_are_page_aligned() {
        seed_pool(64 * PAGESIZE);

        let a = DMAPool::<[u8; 4096]>::new(1).unwrap();
        let b = DMAPool::<[u8; 8192]>::new(2).unwrap();

        assert_eq!(a.get_virt_addr().as_usize() % PAGESIZE, 0);
        assert_eq!(b.get_virt_addr().as_usize() % PAGESIZE, 0);
        assert_eq!(a.get_size(), PAGESIZE);
        assert_eq!(b.get_size(), 2 * PAGESIZE);

        // Identity translation until a platform installs one.
        assert_eq!(a.get_phy_addr().as_usize(), a.get_virt_addr().as_usize());
    }

    #[test]
    fn exhaustion_reports_none() {
        seed_pool(8 * PAGESIZE);
        assert!(DMAPool::<[u8; 4096]>::new(1 << 20).is_none());
    }
}
