//! Page geometry and the DMA view of memory.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::addr::{phy_addr::PhyAddr, virt_addr::VirtAddr, Addr};

pub const PAGESIZE: usize = 4096;

/// Translator from a CPU virtual address to the bus address a DMA master
/// uses for the same memory.
pub type VmToPhy = fn(VirtAddr) -> Option<PhyAddr>;

static TRANSLATOR: AtomicUsize = AtomicUsize::new(0);

/// Install the platform's address translator.
///
/// Until one is installed, memory is assumed identity mapped, which is the
/// common case for bare-metal loaders running with a flat view.
pub fn set_vm_to_phy(translator: VmToPhy) {
    TRANSLATOR.store(translator as usize, Ordering::Release);
}

/// Translate `addr` to the address a DMA engine must be programmed with.
pub fn vm_to_phy(addr: VirtAddr) -> Option<PhyAddr> {
    let raw = TRANSLATOR.load(Ordering::Acquire);
    if raw == 0 {
        Some(PhyAddr::new(addr.as_usize()))
    } else {
        let f: VmToPhy = unsafe { core::mem::transmute(raw) };
        f(addr)
    }
}
