//! Descriptor rings shared with the controller's DMA engine.
//!
//! The rings live in DMA-pool memory and never move. All cursor
//! bookkeeping is done in logical descriptor indices; the mapping to a
//! physical slot (doubled in 64-bit addressing mode) happens in exactly
//! one place, [`HwDmaCap::desc_slot`].

use macb_lib::{
    addr::{Addr, PhyAddr},
    barrier::{membar_consumer, membar_producer},
    cache::{align_up, CacheOps},
    delay::{retry, Delay},
    dma_pool::DMAPool,
    net::ether::PKTALIGN,
    paging::PAGESIZE,
};

use super::macb_regs::*;

/// Addressing width of the DMA engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwDmaCap {
    U32,
    U64,
}

impl HwDmaCap {
    /// Physical descriptor slot backing logical index `idx`.
    ///
    /// In 64-bit mode every logical descriptor occupies two consecutive
    /// records; the second holds the upper address bits.
    #[inline]
    pub fn desc_slot(self, idx: usize) -> usize {
        match self {
            HwDmaCap::U32 => idx,
            HwDmaCap::U64 => idx * 2,
        }
    }

    /// Logical descriptors sharing one CPU cache line.
    #[inline]
    pub fn descs_per_cacheline(self, cacheline_size: usize) -> usize {
        match self {
            HwDmaCap::U32 => cacheline_size / core::mem::size_of::<DmaDesc>(),
            HwDmaCap::U64 => cacheline_size / DMA_DESC_SIZE,
        }
    }
}

/// One 8-byte descriptor record, exactly as the controller sees it.
///
/// Both words are written by the DMA engine behind the CPU's back, so all
/// access is volatile.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DmaDesc {
    addr: u32,
    ctrl: u32,
}

impl DmaDesc {
    #[inline]
    fn addr(&self) -> u32 {
        unsafe { core::ptr::read_volatile(&self.addr) }
    }

    #[inline]
    fn ctrl(&self) -> u32 {
        unsafe { core::ptr::read_volatile(&self.ctrl) }
    }

    #[inline]
    fn set_addr(&mut self, value: u32) {
        unsafe { core::ptr::write_volatile(&mut self.addr, value) }
    }

    #[inline]
    fn set_ctrl(&mut self, value: u32) {
        unsafe { core::ptr::write_volatile(&mut self.ctrl, value) }
    }
}

/// Write a buffer address into the record(s) of one logical descriptor.
/// The upper half must land before the low word; the controller starts
/// fetching as soon as the low word looks valid.
fn set_desc_addr(descs: &mut [DmaDesc], dma_cap: HwDmaCap, slot: usize, addr: u64) {
    if let HwDmaCap::U64 = dma_cap {
        descs[slot + 1].set_addr((addr >> 32) as u32);
    }
    descs[slot].set_addr(addr as u32);
}

pub type RxDescRing = [DmaDesc; MACB_RX_RING_SIZE * DMA_DESC_SIZE / 8];
pub type TxDescRing = [DmaDesc; MACB_TX_RING_SIZE * DMA_DESC_SIZE / 8];
pub type DummyDescRing = [DmaDesc; DMA_DESC_SIZE / 8];

const fn pages(bytes: usize) -> usize {
    (bytes + PAGESIZE - 1) / PAGESIZE
}

/// A complete frame sitting in the receive ring.
#[derive(Debug, Clone, Copy)]
pub struct RxFrame {
    /// Pool slot where the frame's bytes begin (the reclaim tail at the
    /// time the end-of-frame marker was found).
    pub start_slot: usize,
    pub len: usize,
    /// The frame's bytes run past the last slot and continue at slot 0.
    pub wrapped: bool,
}

/// Receive ring: 32 descriptors and a flat buffer pool with one fixed-size
/// slot per descriptor.
pub struct RxRing {
    descs: DMAPool<RxDescRing>,
    pool: DMAPool<u8>,
    buffer_size: usize,
    dma_cap: HwDmaCap,
    cacheline_size: usize,
    /// Oldest descriptor not yet given back to the controller. Only
    /// [`RxRing::reclaim`] advances it.
    tail: usize,
    /// Next descriptor the scan will inspect.
    next_tail: usize,
    wrapped: bool,
}

impl RxRing {
    pub fn new(dma_cap: HwDmaCap, cacheline_size: usize, buffer_size: usize) -> Option<Self> {
        let descs = DMAPool::new(pages(MACB_RX_RING_SIZE * DMA_DESC_SIZE))?;
        let pool = DMAPool::new(pages(MACB_RX_RING_SIZE * buffer_size))?;

        Some(RxRing {
            descs,
            pool,
            buffer_size,
            dma_cap,
            cacheline_size,
            tail: 0,
            next_tail: 0,
            wrapped: false,
        })
    }

    /// Bus address of the descriptor ring, for the queue base registers.
    pub fn dma_addr(&self) -> PhyAddr {
        self.descs.get_phy_addr()
    }

    /// Point every descriptor at its pool slot, mark the last one with the
    /// wrap bit, and hand the whole ring to the controller.
    pub fn init(&mut self, cache: &dyn CacheOps) {
        let pool_base = self.pool.get_phy_addr().as_usize() as u64;
        let buffer_size = self.buffer_size;
        let dma_cap = self.dma_cap;

        let descs = self.descs.as_mut();
        for i in 0..MACB_RX_RING_SIZE {
            let mut paddr = pool_base + (i * buffer_size) as u64;
            if i == MACB_RX_RING_SIZE - 1 {
                paddr |= RXD_WRAP as u64;
            }
            let slot = dma_cap.desc_slot(i);
            descs[slot].set_ctrl(0);
            set_desc_addr(descs, dma_cap, slot, paddr);
        }

        self.tail = 0;
        self.next_tail = 0;
        self.wrapped = false;

        self.flush_descs(cache);
        self.flush_pool(cache);
    }

    /// Restart the scan from the reclaim tail. Called once per receive
    /// poll; anything the previous pass looked at but did not consume is
    /// scanned again.
    pub fn restart_scan(&mut self) {
        self.next_tail = self.tail;
        self.wrapped = false;
    }

    /// Index the next reclaim must advance to once the current frame is
    /// released.
    pub fn pending_tail(&self) -> usize {
        self.next_tail
    }

    /// Single-pass scan for a complete frame, bounded by one ring
    /// traversal. `None` means no complete frame is available yet.
    pub fn poll_frame(&mut self, cache: &dyn CacheOps) -> Option<RxFrame> {
        for _ in 0..MACB_RX_RING_SIZE {
            self.invalidate_descs(cache);

            let slot = self.dma_cap.desc_slot(self.next_tail);
            let (addr, status) = {
                let descs = self.descs.as_ref();
                (descs[slot].addr(), descs[slot].ctrl())
            };

            if addr & RXD_USED == 0 {
                return None;
            }

            if status & RXD_SOF != 0 {
                if self.next_tail != self.tail {
                    let up_to = self.next_tail;
                    self.reclaim(up_to, cache);
                }
                self.wrapped = false;
            }

            if status & RXD_EOF != 0 {
                let frame = RxFrame {
                    start_slot: self.tail,
                    len: (status & RXD_FRMLEN_MASK) as usize,
                    wrapped: self.wrapped,
                };

                self.invalidate_pool(cache);

                self.next_tail += 1;
                if self.next_tail >= MACB_RX_RING_SIZE {
                    self.next_tail = 0;
                }
                return Some(frame);
            }

            self.next_tail += 1;
            if self.next_tail >= MACB_RX_RING_SIZE {
                self.wrapped = true;
                self.next_tail = 0;
            }
        }

        None
    }

    /// Materialize a frame found by [`RxRing::poll_frame`].
    ///
    /// A frame that wrapped past the end of the ring is linearized into
    /// `scratch`; otherwise the returned slice points straight into the
    /// pool.
    pub fn frame_data<'a>(&'a self, frame: &RxFrame, scratch: &'a mut [u8]) -> Option<&'a [u8]> {
        let pool_va = self.pool.get_virt_addr().as_usize();

        if frame.wrapped {
            let head_len = self.buffer_size * (MACB_RX_RING_SIZE - frame.start_slot);
            let tail_len = frame.len.checked_sub(head_len)?;
            if frame.len > scratch.len() {
                return None;
            }

            unsafe {
                let head = (pool_va + frame.start_slot * self.buffer_size) as *const u8;
                core::ptr::copy_nonoverlapping(head, scratch.as_mut_ptr(), head_len);
                core::ptr::copy_nonoverlapping(
                    pool_va as *const u8,
                    scratch.as_mut_ptr().add(head_len),
                    tail_len,
                );
            }

            Some(&scratch[..frame.len])
        } else {
            let start = pool_va + frame.start_slot * self.buffer_size;
            Some(unsafe { core::slice::from_raw_parts(start as *const u8, frame.len) })
        }
    }

    /// Give descriptors `[tail, new_tail)` back to the controller,
    /// wrap-aware ascending, deferring each clear to its cache-line
    /// boundary.
    pub fn reclaim(&mut self, new_tail: usize, cache: &dyn CacheOps) {
        let mut i = self.tail;

        self.invalidate_descs(cache);

        while i > new_tail {
            self.reclaim_on_boundary(i);
            i += 1;
            if i >= MACB_RX_RING_SIZE {
                i = 0;
            }
        }

        while i < new_tail {
            self.reclaim_on_boundary(i);
            i += 1;
        }

        self.flush_descs(cache);
        self.tail = new_tail;
    }

    /// Clear used bits at cache-line granularity.
    ///
    /// A flush writes back whole lines, so clearing one descriptor's used
    /// bit would also write back stale neighbours and destroy anything the
    /// controller wrote to them meanwhile. The clear is therefore deferred
    /// until the sweep reaches the last descriptor of the line, then the
    /// whole line is cleared in one pass.
    fn reclaim_on_boundary(&mut self, idx: usize) {
        let mask = self.dma_cap.descs_per_cacheline(self.cacheline_size) - 1;
        if idx & mask != mask {
            return;
        }

        let dma_cap = self.dma_cap;
        let descs = self.descs.as_mut();
        for i in (idx & !mask)..=idx {
            let slot = dma_cap.desc_slot(i);
            let addr = descs[slot].addr();
            descs[slot].set_addr(addr & !RXD_USED);
        }
    }

    fn invalidate_descs(&self, cache: &dyn CacheOps) {
        cache.invalidate_range(
            self.descs.get_virt_addr(),
            align_up(MACB_RX_RING_SIZE * DMA_DESC_SIZE, PKTALIGN),
        );
        membar_consumer();
    }

    fn flush_descs(&self, cache: &dyn CacheOps) {
        membar_producer();
        cache.flush_range(
            self.descs.get_virt_addr(),
            align_up(MACB_RX_RING_SIZE * DMA_DESC_SIZE, PKTALIGN),
        );
    }

    fn invalidate_pool(&self, cache: &dyn CacheOps) {
        cache.invalidate_range(
            self.pool.get_virt_addr(),
            align_up(MACB_RX_RING_SIZE * self.buffer_size, PKTALIGN),
        );
        membar_consumer();
    }

    fn flush_pool(&self, cache: &dyn CacheOps) {
        membar_producer();
        cache.flush_range(
            self.pool.get_virt_addr(),
            align_up(MACB_RX_RING_SIZE * self.buffer_size, PKTALIGN),
        );
    }
}

/// Transmit ring: 16 descriptors, one synchronous in-flight frame.
pub struct TxRing {
    descs: DMAPool<TxDescRing>,
    dma_cap: HwDmaCap,
    /// Next free slot to post into.
    head: usize,
}

impl TxRing {
    pub fn new(dma_cap: HwDmaCap) -> Option<Self> {
        let descs = DMAPool::new(pages(MACB_TX_RING_SIZE * DMA_DESC_SIZE))?;

        Some(TxRing {
            descs,
            dma_cap,
            head: 0,
        })
    }

    pub fn dma_addr(&self) -> PhyAddr {
        self.descs.get_phy_addr()
    }

    /// Mark every descriptor owned by software, wrap bit on the last.
    pub fn init(&mut self, cache: &dyn CacheOps) {
        let dma_cap = self.dma_cap;

        let descs = self.descs.as_mut();
        for i in 0..MACB_TX_RING_SIZE {
            let slot = dma_cap.desc_slot(i);
            set_desc_addr(descs, dma_cap, slot, 0);
            if i == MACB_TX_RING_SIZE - 1 {
                descs[slot].set_ctrl(TXD_USED | TXD_WRAP);
            } else {
                descs[slot].set_ctrl(TXD_USED);
            }
        }

        self.head = 0;
        self.flush_descs(cache);
    }

    /// Post one mapped buffer and hand the descriptor to the controller.
    /// Returns the logical index the frame was posted at.
    pub fn post(&mut self, buf_addr: u64, len: usize, cache: &dyn CacheOps) -> usize {
        let idx = self.head;

        let mut ctrl = (len as u32) & TXD_FRMLEN_MASK;
        ctrl |= TXD_LAST;
        if idx == MACB_TX_RING_SIZE - 1 {
            ctrl |= TXD_WRAP;
            self.head = 0;
        } else {
            self.head += 1;
        }

        let dma_cap = self.dma_cap;
        let slot = dma_cap.desc_slot(idx);
        let descs = self.descs.as_mut();
        descs[slot].set_ctrl(ctrl);
        set_desc_addr(descs, dma_cap, slot, buf_addr);

        self.flush_descs(cache);

        idx
    }

    /// Wait for the controller to set the used bit on descriptor `idx`.
    ///
    /// Bounded by [`MACB_TX_TIMEOUT`] attempts; returns the final control
    /// word, or `None` when the bound expires with the slot still claimed
    /// by hardware.
    pub fn poll_completion(
        &self,
        idx: usize,
        cache: &dyn CacheOps,
        delay: &dyn Delay,
    ) -> Option<u32> {
        retry(MACB_TX_TIMEOUT, 1, delay, || {
            self.invalidate_descs(cache);
            let ctrl = self.descs.as_ref()[self.dma_cap.desc_slot(idx)].ctrl();
            (ctrl & TXD_USED != 0).then_some(ctrl)
        })
    }

    fn invalidate_descs(&self, cache: &dyn CacheOps) {
        cache.invalidate_range(
            self.descs.get_virt_addr(),
            align_up(MACB_TX_RING_SIZE * DMA_DESC_SIZE, PKTALIGN),
        );
        membar_consumer();
    }

    fn flush_descs(&self, cache: &dyn CacheOps) {
        membar_producer();
        cache.flush_range(
            self.descs.get_virt_addr(),
            align_up(MACB_TX_RING_SIZE * DMA_DESC_SIZE, PKTALIGN),
        );
    }
}

/// The shared one-descriptor ring that parks disabled queues.
///
/// Its single descriptor is permanently owned by software, so a queue
/// whose base register points here never starts a DMA transfer.
pub struct DummyRing {
    descs: DMAPool<DummyDescRing>,
}

impl DummyRing {
    pub fn new() -> Option<Self> {
        let descs = DMAPool::new(pages(DMA_DESC_SIZE))?;
        Some(DummyRing { descs })
    }

    pub fn dma_addr(&self) -> PhyAddr {
        self.descs.get_phy_addr()
    }

    pub fn init(&mut self, cache: &dyn CacheOps) {
        let descs = self.descs.as_mut();
        descs[0].set_ctrl(TXD_USED);
        descs[0].set_addr(0);

        membar_producer();
        cache.flush_range(
            self.descs.get_virt_addr(),
            align_up(DMA_DESC_SIZE, PKTALIGN),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use macb_lib::{addr::VirtAddr, cache::Coherent, dma_pool::init_dma_pool};

    fn seed_pool() {
        let mem = vec![0u8; 256 * PAGESIZE].leak();
        let base = (mem.as_mut_ptr() as usize + PAGESIZE - 1) & !(PAGESIZE - 1);
        unsafe { init_dma_pool(VirtAddr::new(base), 255 * PAGESIZE) };
    }

    fn rx_used(ring: &RxRing, idx: usize) -> bool {
        ring.descs.as_ref()[ring.dma_cap.desc_slot(idx)].addr() & RXD_USED != 0
    }

    fn rx_mark_used(ring: &mut RxRing, idx: usize) {
        let slot = ring.dma_cap.desc_slot(idx);
        let descs = ring.descs.as_mut();
        let addr = descs[slot].addr();
        descs[slot].set_addr(addr | RXD_USED);
    }

    fn rx_set_status(ring: &mut RxRing, idx: usize, status: u32) {
        let slot = ring.dma_cap.desc_slot(idx);
        ring.descs.as_mut()[slot].set_ctrl(status);
    }

    struct CountingDelay(Cell<u32>);

    impl Delay for CountingDelay {
        fn wait_microsec(&self, _usec: u64) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn rx_init_places_one_wrap_marker_on_the_last_slot() {
        seed_pool();
        let mut ring = RxRing::new(HwDmaCap::U32, 64, MACB_RX_BUFFER_SIZE).unwrap();
        ring.init(&Coherent);

        let pool_base = ring.pool.get_phy_addr().as_usize();
        let descs = ring.descs.as_ref();
        let mut wraps = 0;
        for i in 0..MACB_RX_RING_SIZE {
            let addr = descs[i].addr();
            if addr & RXD_WRAP != 0 {
                wraps += 1;
                assert_eq!(i, MACB_RX_RING_SIZE - 1);
            }
            assert_eq!(addr & !0x3, (pool_base + i * MACB_RX_BUFFER_SIZE) as u32);
            assert_eq!(addr & RXD_USED, 0);
        }
        assert_eq!(wraps, 1);
    }

    #[test]
    fn tx_init_marks_all_used_and_wraps_the_last_slot() {
        seed_pool();
        let mut ring = TxRing::new(HwDmaCap::U32).unwrap();
        ring.init(&Coherent);

        let descs = ring.descs.as_ref();
        for i in 0..MACB_TX_RING_SIZE {
            let ctrl = descs[i].ctrl();
            assert_ne!(ctrl & TXD_USED, 0);
            assert_eq!(ctrl & TXD_WRAP != 0, i == MACB_TX_RING_SIZE - 1);
        }
    }

    #[test]
    fn desc_addr_split_only_in_64bit_mode() {
        let mut descs = [DmaDesc { addr: 0, ctrl: 0 }; 4];

        set_desc_addr(&mut descs, HwDmaCap::U64, 2, 0x0000_0001_2345_6780);
        assert_eq!(descs[2].addr(), 0x2345_6780);
        assert_eq!(descs[3].addr(), 0x1);

        let mut descs = [DmaDesc { addr: 0xa5a5_a5a5, ctrl: 0 }; 4];
        set_desc_addr(&mut descs, HwDmaCap::U32, 2, 0x2345_6780);
        assert_eq!(descs[2].addr(), 0x2345_6780);
        // 32-bit mode never touches the neighbouring record.
        assert_eq!(descs[3].addr(), 0xa5a5_a5a5);
    }

    #[test]
    fn logical_index_maps_to_doubled_slot() {
        for k in 0..MACB_RX_RING_SIZE {
            assert_eq!(HwDmaCap::U32.desc_slot(k), k);
            assert_eq!(HwDmaCap::U64.desc_slot(k), 2 * k);
        }
    }

    #[test]
    fn rx_init_in_32bit_mode_leaves_odd_slots_alone() {
        seed_pool();
        let mut ring = RxRing::new(HwDmaCap::U32, 64, MACB_RX_BUFFER_SIZE).unwrap();

        for i in 0..MACB_RX_RING_SIZE {
            ring.descs.as_mut()[MACB_RX_RING_SIZE + i].set_addr(0x5a5a_5a5a);
        }
        ring.init(&Coherent);
        ring.reclaim(8, &Coherent);

        // Only the first 32 records belong to the ring in 32-bit mode.
        for i in 0..MACB_RX_RING_SIZE {
            assert_eq!(ring.descs.as_ref()[MACB_RX_RING_SIZE + i].addr(), 0x5a5a_5a5a);
        }
    }

    #[test]
    fn reclaim_defers_to_cacheline_boundaries() {
        seed_pool();

        for (cacheline, cap) in [
            (32, HwDmaCap::U32),
            (64, HwDmaCap::U32),
            (32, HwDmaCap::U64),
            (64, HwDmaCap::U64),
        ] {
            let mut ring = RxRing::new(cap, cacheline, MACB_RX_BUFFER_SIZE).unwrap();
            ring.init(&Coherent);
            for i in 0..MACB_RX_RING_SIZE {
                rx_mark_used(&mut ring, i);
            }

            let per_line = cap.descs_per_cacheline(cacheline);

            // Stop short of the boundary: nothing may be cleared yet.
            ring.reclaim(per_line - 1, &Coherent);
            for i in 0..MACB_RX_RING_SIZE {
                assert!(rx_used(&ring, i), "cleared {i} before its line was complete");
            }

            // Crossing the boundary clears the whole line at once and
            // nothing beyond it.
            ring.reclaim(per_line + 1, &Coherent);
            for i in 0..per_line {
                assert!(!rx_used(&ring, i));
            }
            for i in per_line..MACB_RX_RING_SIZE {
                assert!(rx_used(&ring, i), "cleared {i} past the swept range");
            }
        }
    }

    #[test]
    fn reclaim_handles_the_ring_wrap() {
        seed_pool();
        let mut ring = RxRing::new(HwDmaCap::U32, 64, MACB_RX_BUFFER_SIZE).unwrap();
        ring.init(&Coherent);
        for i in 0..MACB_RX_RING_SIZE {
            rx_mark_used(&mut ring, i);
        }

        ring.tail = 24;
        ring.reclaim(2, &Coherent);

        // 24..=31 form a complete 8-descriptor line; 0 and 1 do not.
        for i in 24..MACB_RX_RING_SIZE {
            assert!(!rx_used(&ring, i));
        }
        assert!(rx_used(&ring, 0));
        assert!(rx_used(&ring, 1));
        assert_eq!(ring.tail, 2);
    }

    #[test]
    fn poll_frame_reports_nothing_without_used_descriptors() {
        seed_pool();
        let mut ring = RxRing::new(HwDmaCap::U32, 64, MACB_RX_BUFFER_SIZE).unwrap();
        ring.init(&Coherent);
        ring.restart_scan();

        assert!(ring.poll_frame(&Coherent).is_none());
    }

    #[test]
    fn single_descriptor_frame_is_zero_copy() {
        seed_pool();
        let mut ring = RxRing::new(HwDmaCap::U32, 64, MACB_RX_BUFFER_SIZE).unwrap();
        ring.init(&Coherent);

        rx_mark_used(&mut ring, 0);
        rx_set_status(&mut ring, 0, RXD_SOF | RXD_EOF | 60);

        let pool_va = ring.pool.get_virt_addr().as_usize();
        for i in 0..60u8 {
            unsafe { *((pool_va + i as usize) as *mut u8) = i };
        }

        ring.restart_scan();
        let frame = ring.poll_frame(&Coherent).expect("frame");
        assert_eq!(frame.start_slot, 0);
        assert_eq!(frame.len, 60);
        assert!(!frame.wrapped);

        let mut scratch = [0u8; 1536];
        let data = ring.frame_data(&frame, &mut scratch).unwrap();
        assert_eq!(data.as_ptr() as usize, pool_va);
        assert!(data.iter().enumerate().all(|(i, &b)| b == i as u8));
        assert_eq!(ring.pending_tail(), 1);
    }

    #[test]
    fn wrapped_frame_is_reassembled_byte_for_byte() {
        seed_pool();
        let mut ring = RxRing::new(HwDmaCap::U32, 64, MACB_RX_BUFFER_SIZE).unwrap();
        ring.init(&Coherent);

        // Frame starts in slot 30, runs through 31 and 0, ends in slot 1.
        let len = 2 * MACB_RX_BUFFER_SIZE + 44;
        let reference: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();

        ring.tail = 30;
        ring.next_tail = 30;

        rx_mark_used(&mut ring, 30);
        rx_set_status(&mut ring, 30, RXD_SOF);
        rx_mark_used(&mut ring, 31);
        rx_mark_used(&mut ring, 0);
        rx_mark_used(&mut ring, 1);
        rx_set_status(&mut ring, 1, RXD_EOF | len as u32);

        let pool_va = ring.pool.get_virt_addr().as_usize();
        let head_len = MACB_RX_BUFFER_SIZE * (MACB_RX_RING_SIZE - 30);
        unsafe {
            let head = (pool_va + 30 * MACB_RX_BUFFER_SIZE) as *mut u8;
            core::ptr::copy_nonoverlapping(reference.as_ptr(), head, head_len);
            core::ptr::copy_nonoverlapping(
                reference.as_ptr().add(head_len),
                pool_va as *mut u8,
                len - head_len,
            );
        }

        let frame = ring.poll_frame(&Coherent).expect("frame");
        assert_eq!(frame.start_slot, 30);
        assert_eq!(frame.len, len);
        assert!(frame.wrapped);

        let mut scratch = vec![0u8; 1536];
        let data = ring.frame_data(&frame, &mut scratch).unwrap();
        assert_eq!(data, &reference[..]);
    }

    #[test]
    fn tx_post_advances_and_wraps_the_head() {
        seed_pool();
        let mut ring = TxRing::new(HwDmaCap::U32).unwrap();
        ring.init(&Coherent);

        for i in 0..MACB_TX_RING_SIZE {
            let idx = ring.post(0x1000 + (i * 0x100) as u64, 64, &Coherent);
            assert_eq!(idx, i);

            let ctrl = ring.descs.as_ref()[idx].ctrl();
            assert_eq!(ctrl & TXD_FRMLEN_MASK, 64);
            assert_ne!(ctrl & TXD_LAST, 0);
            assert_eq!(ctrl & TXD_USED, 0, "posting must hand the slot to hardware");
            assert_eq!(ctrl & TXD_WRAP != 0, i == MACB_TX_RING_SIZE - 1);
        }
        assert_eq!(ring.head, 0);
    }

    #[test]
    fn tx_completion_poll_expires_after_the_configured_bound() {
        seed_pool();
        let mut ring = TxRing::new(HwDmaCap::U32).unwrap();
        ring.init(&Coherent);

        let idx = ring.post(0x1000, 64, &Coherent);

        let delay = CountingDelay(Cell::new(0));
        assert!(ring.poll_completion(idx, &Coherent, &delay).is_none());
        assert_eq!(delay.0.get(), MACB_TX_TIMEOUT);

        // Hardware reporting completion ends the poll with the status.
        let slot = ring.dma_cap.desc_slot(idx);
        let ctrl = ring.descs.as_ref()[slot].ctrl();
        ring.descs.as_mut()[slot].set_ctrl(ctrl | TXD_USED | TXD_UNDERRUN);

        let done = ring.poll_completion(idx, &Coherent, &delay).unwrap();
        assert_ne!(done & TXD_UNDERRUN, 0);
    }
}
