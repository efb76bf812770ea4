//! # Cadence MACB/GEM Ethernet controller
//!
//! Polled driver for the Cadence MACB 10/100 MAC and its gigabit-capable
//! GEM variant, as integrated on Atmel, Xilinx, SiFive and Hailo SoCs.
//! The driver runs in a single execution context with no scheduler: every
//! hardware wait is a bounded poll and reception is non-blocking.
//!
//! Platform integration is injected at probe time: register access,
//! cache maintenance, delays, clock control and the link-speed strategy
//! all arrive as capabilities, so one core serves every board flavor.

use alloc::boxed::Box;

use bitflags::bitflags;
use macb_lib::{
    addr::{Addr, VirtAddr},
    cache::{align_up, CacheOps, Coherent, DMA_MINALIGN},
    clock::{ClockCtl, ClockError, ClockLine, LinkSpeedHook, NullClock, TxClkRate},
    delay::{retry, Delay, SpinDelay},
    mmio::RegBlock,
    net::{
        ether::PKTSIZE_ALIGN,
        net_device::{LinkStatus, NetDevError, NetDevice, NetFlags, RxPacket},
    },
    paging,
};

mod macb_phy;
mod macb_ring;

#[allow(dead_code)]
mod macb_regs;

#[allow(dead_code)]
mod mii;

use macb_regs::*;

pub use macb_phy::{Duplex, LinkResult, Speed};
pub use macb_ring::HwDmaCap;

use macb_ring::{DummyRing, RxRing, TxRing};

/// Attempts to wait for an in-flight transmission to drain at halt.
const MACB_HALT_TIMEOUT: u32 = 1000;

bitflags! {
    /// Silicon quirks of a particular controller integration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MacbCaps: u32 {
        /// The USR I/O register carries a clock-enable bit.
        const USRIO_HAS_CLKEN = 1 << 0;
        /// GEM configured for 10/100 only; never negotiate gigabit.
        const NO_GIGABIT = 1 << 1;
    }
}

/// Interface mode between the MAC and its PHY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyInterfaceMode {
    Mii,
    Rmii,
    Gmii,
    Rgmii,
    RgmiiId,
    RgmiiRxid,
    RgmiiTxid,
    Sgmii,
}

impl PhyInterfaceMode {
    /// Parse a device-tree style mode string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mii" => Some(Self::Mii),
            "rmii" => Some(Self::Rmii),
            "gmii" => Some(Self::Gmii),
            "rgmii" => Some(Self::Rgmii),
            "rgmii-id" => Some(Self::RgmiiId),
            "rgmii-rxid" => Some(Self::RgmiiRxid),
            "rgmii-txid" => Some(Self::RgmiiTxid),
            "sgmii" => Some(Self::Sgmii),
            _ => None,
        }
    }

    fn is_rgmii(self) -> bool {
        matches!(
            self,
            Self::Rgmii | Self::RgmiiId | Self::RgmiiRxid | Self::RgmiiTxid
        )
    }

    fn gigabit_capable(self) -> bool {
        matches!(self, Self::Gmii | Self::Sgmii) || self.is_rgmii()
    }
}

/// Per-platform USR I/O bit assignments.
#[derive(Debug, Clone, Copy)]
pub struct UsrioCfg {
    pub mii: u32,
    pub rmii: u32,
    pub rgmii: u32,
    pub clken: u32,
}

pub const MACB_DEFAULT_USRIO: UsrioCfg = UsrioCfg {
    mii: 1 << 0,
    rmii: 1 << 0,
    rgmii: 1 << 0,
    clken: 1 << 2,
};

/// Static link description for platforms without a negotiating PHY.
#[derive(Debug, Clone, Copy)]
pub struct FixedLink {
    pub speed: Speed,
    pub duplex: Duplex,
}

/// Board/silicon configuration, passed at construction. One value per
/// compatible controller integration; no global lookup tables.
#[derive(Debug, Clone, Copy)]
pub struct MacbConfig {
    /// DMA fixed burst length programmed into the DMA configuration
    /// register; 0 leaves the reset value.
    pub dma_burst_length: u32,
    pub hw_dma_cap: HwDmaCap,
    pub caps: MacbCaps,
    /// Queues the board wants, intersected with what the silicon
    /// supports; 0 means "whatever the controller offers".
    pub queue_mask: u32,
    pub disable_queues_at_halt: bool,
    pub disable_queues_at_init: bool,
    pub allocate_segments_equally: bool,
    pub disable_clocks_at_stop: bool,
    pub usrio: UsrioCfg,
    /// `Some` skips PHY negotiation entirely.
    pub fixed_link: Option<FixedLink>,
    /// Peripheral clock rate fallback when the clock capability cannot
    /// report one.
    pub pclk_rate_hz: u64,
    /// CPU data cache line size, for descriptor reclaim batching.
    pub cacheline_size: usize,
}

impl Default for MacbConfig {
    fn default() -> Self {
        MacbConfig {
            dma_burst_length: 16,
            hw_dma_cap: HwDmaCap::U32,
            caps: MacbCaps::empty(),
            queue_mask: 0,
            disable_queues_at_halt: false,
            disable_queues_at_init: false,
            allocate_segments_equally: false,
            disable_clocks_at_stop: false,
            usrio: MACB_DEFAULT_USRIO,
            fixed_link: None,
            pclk_rate_hz: 0,
            cacheline_size: DMA_MINALIGN,
        }
    }
}

/// Platform capabilities injected at probe time.
pub struct MacbPlatform {
    pub cache: Box<dyn CacheOps>,
    pub delay: Box<dyn Delay>,
    pub clocks: Box<dyn ClockCtl>,
    pub linkspd: Box<dyn LinkSpeedHook>,
}

impl Default for MacbPlatform {
    fn default() -> Self {
        MacbPlatform {
            cache: Box::new(Coherent),
            delay: Box::new(SpinDelay::default()),
            clocks: Box::new(NullClock),
            linkspd: Box::new(TxClkRate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacbDriverErr {
    /// No PHY answered on the management bus.
    NoPhy,
    /// Link negotiation did not complete within the poll bound.
    LinkDown,
    /// Missing or unsupported interface configuration.
    InvalidConfig,
    /// The PHY maintenance logic never went idle.
    MdioTimeout,
    /// A buffer could not be translated to a bus address.
    DmaMap,
    /// DMA pool exhausted while allocating rings or buffers.
    OutOfMemory,
    /// Frame too long for a transmit descriptor, or torn on receive.
    InvalidPacket,
    /// No complete frame available.
    WouldBlock,
    Clock(ClockError),
}

impl core::fmt::Display for MacbDriverErr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::NoPhy => write!(f, "no PHY found"),
            Self::LinkDown => write!(f, "link down"),
            Self::InvalidConfig => write!(f, "invalid configuration"),
            Self::MdioTimeout => write!(f, "MDIO access timed out"),
            Self::DmaMap => write!(f, "buffer not reachable by DMA"),
            Self::OutOfMemory => write!(f, "DMA memory exhausted"),
            Self::InvalidPacket => write!(f, "invalid packet"),
            Self::WouldBlock => write!(f, "no packet available"),
            Self::Clock(e) => write!(f, "clock failure: {}", e),
        }
    }
}

impl From<ClockError> for MacbDriverErr {
    fn from(value: ClockError) -> Self {
        MacbDriverErr::Clock(value)
    }
}

impl From<MacbDriverErr> for NetDevError {
    fn from(value: MacbDriverErr) -> Self {
        if value == MacbDriverErr::WouldBlock {
            return NetDevError::WouldBlock;
        }

        log::error!("macb: {}", value);

        match value {
            MacbDriverErr::NoPhy => NetDevError::NoDevice,
            MacbDriverErr::LinkDown => NetDevError::LinkDown,
            MacbDriverErr::InvalidConfig => NetDevError::InvalidConfig,
            MacbDriverErr::MdioTimeout => NetDevError::Timeout,
            MacbDriverErr::OutOfMemory => NetDevError::OutOfMemory,
            MacbDriverErr::WouldBlock => NetDevError::WouldBlock,
            MacbDriverErr::DmaMap
            | MacbDriverErr::InvalidPacket
            | MacbDriverErr::Clock(_) => NetDevError::DeviceError,
        }
    }
}

/// Outcome of one synchronous transmission.
///
/// The send path reports success regardless of completion faults; callers
/// that want to act on degradation inspect this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Completed,
    Underrun,
    BufferExhausted,
    TimedOut,
}

/// One MACB/GEM controller instance. Owns its rings and buffers from
/// probe to drop; never shared.
pub struct Macb {
    regs: RegBlock,
    config: MacbConfig,
    phy_interface: PhyInterfaceMode,
    phy_addr: u8,
    is_gem: bool,
    rx_buffer_size: usize,
    flags: NetFlags,
    link: Option<LinkResult>,

    rx: RxRing,
    tx: TxRing,
    dummy: DummyRing,
    /// Linear reassembly buffer for frames that wrap past the ring end.
    scratch: Box<[u8]>,

    cache: Box<dyn CacheOps>,
    delay: Box<dyn Delay>,
    clocks: Box<dyn ClockCtl>,
    linkspd: Box<dyn LinkSpeedHook>,
}

impl core::fmt::Debug for Macb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Macb")
            .field("phy_interface", &self.phy_interface)
            .field("phy_addr", &self.phy_addr)
            .field("is_gem", &self.is_gem)
            .field("rx_buffer_size", &self.rx_buffer_size)
            .finish_non_exhaustive()
    }
}

impl Macb {
    /// Probe the controller: detect the variant, resolve clocks, allocate
    /// rings and buffers, and program the MDC divider so the PHY is
    /// reachable.
    pub fn probe(
        regs: RegBlock,
        phy_addr: u8,
        phy_interface: PhyInterfaceMode,
        config: MacbConfig,
        mut platform: MacbPlatform,
    ) -> Result<Self, MacbDriverErr> {
        let is_gem = macb_is_gem(&regs);

        let _ = platform.clocks.enable(ClockLine::Pclk);
        let _ = platform.clocks.enable(ClockLine::Hclk);

        let pclk_rate = match platform.clocks.rate(ClockLine::Pclk) {
            Ok(rate) if rate > 0 => rate,
            _ if config.pclk_rate_hz > 0 => config.pclk_rate_hz,
            _ => return Err(MacbDriverErr::InvalidConfig),
        };

        let rx_buffer_size = if is_gem {
            GEM_RX_BUFFER_SIZE
        } else {
            MACB_RX_BUFFER_SIZE
        };

        let rx = RxRing::new(config.hw_dma_cap, config.cacheline_size, rx_buffer_size)
            .ok_or(MacbDriverErr::OutOfMemory)?;
        let tx = TxRing::new(config.hw_dma_cap).ok_or(MacbDriverErr::OutOfMemory)?;
        let dummy = DummyRing::new().ok_or(MacbDriverErr::OutOfMemory)?;
        let scratch = alloc::vec![0u8; PKTSIZE_ALIGN].into_boxed_slice();

        // Enough configuration to talk to the PHY.
        let mut ncfgr = macb_phy::mdc_clk_div(is_gem, pclk_rate);
        if is_gem {
            ncfgr |= macb_dbw(&regs);
        }
        regs.write32(NCFGR, ncfgr);

        log::info!(
            "{}: controller at {:#x}, pclk {} Hz",
            if is_gem { "gmac" } else { "macb" },
            regs.base(),
            pclk_rate
        );

        Ok(Macb {
            regs,
            config,
            phy_interface,
            phy_addr,
            is_gem,
            rx_buffer_size,
            flags: NetFlags::empty(),
            link: None,
            rx,
            tx,
            dummy,
            scratch,
            cache: platform.cache,
            delay: platform.delay,
            clocks: platform.clocks,
            linkspd: platform.linkspd,
        })
    }

    /// Read the 64-bit addressing capability out of the design
    /// configuration, for platforms that do not pin it.
    pub fn detect_dma_cap(regs: &RegBlock) -> HwDmaCap {
        if regs.read32(GEM_DCFG6) & DCFG6_DAW64 != 0 {
            HwDmaCap::U64
        } else {
            HwDmaCap::U32
        }
    }

    /// Bring the controller up: rings, DMA, queues, PHY, then enable.
    ///
    /// The controller is assumed halted; [`Macb::halt`] ran either at
    /// probe-reset or on the previous stop.
    pub fn init(&mut self) -> Result<(), MacbDriverErr> {
        if self.config.disable_clocks_at_stop {
            let _ = self.clocks.enable(ClockLine::Pclk);
            let _ = self.clocks.enable(ClockLine::Hclk);
        }

        self.rx.init(&*self.cache);
        self.tx.init(&*self.cache);

        let rx_dma = self.rx.dma_addr().as_usize() as u64;
        let tx_dma = self.tx.dma_addr().as_usize() as u64;
        self.regs.write32(RBQP, rx_dma as u32);
        self.regs.write32(TBQP, tx_dma as u32);
        if self.config.hw_dma_cap == HwDmaCap::U64 {
            self.regs.write32(GEM_RBQPH, (rx_dma >> 32) as u32);
            self.regs.write32(GEM_TBQPH, (tx_dma >> 32) as u32);
        }

        if self.is_gem {
            self.configure_dma();
            self.init_multi_queues();

            let mut val = if self.phy_interface.is_rgmii() {
                self.config.usrio.rgmii
            } else if self.phy_interface == PhyInterfaceMode::Rmii {
                self.config.usrio.rmii
            } else if self.phy_interface == PhyInterfaceMode::Mii {
                self.config.usrio.mii
            } else {
                0
            };
            if self.config.caps.contains(MacbCaps::USRIO_HAS_CLKEN) {
                val |= self.config.usrio.clken;
            }
            self.regs.write32(USRIO, val);

            if self.phy_interface == PhyInterfaceMode::Sgmii {
                self.regs
                    .setbits(NCFGR, GEM_NCFGR_SGMIIEN | GEM_NCFGR_PCSSEL);
            }
        } else {
            // RMII or MII pin selection; boards routing a clock-enable
            // through USR I/O keep it asserted either way.
            let val = if self.config.caps.contains(MacbCaps::USRIO_HAS_CLKEN) {
                if self.phy_interface == PhyInterfaceMode::Rmii {
                    self.config.usrio.rmii | self.config.usrio.clken
                } else {
                    self.config.usrio.clken
                }
            } else if self.phy_interface == PhyInterfaceMode::Rmii {
                0
            } else {
                self.config.usrio.mii
            };
            self.regs.write32(USRIO, val);
        }

        self.phy_init()?;

        // Enable TX and RX.
        self.regs.write32(NCR, NCR_TE | NCR_RE);
        self.flags.insert(NetFlags::UP | NetFlags::RUNNING);

        Ok(())
    }

    /// Halt the controller and wait for the in-flight frame to drain.
    pub fn halt(&mut self) {
        self.regs.setbits(NCR, NCR_THALT);

        let drained = retry(MACB_HALT_TIMEOUT, 1, &*self.delay, || {
            (self.regs.read32(TSR) & TSR_TGO == 0).then_some(())
        });
        if drained.is_none() {
            log::warn!("macb: transmitter still busy at halt");
        }

        // Disable TX and RX, clear statistics.
        self.regs.write32(NCR, NCR_CLRSTAT);

        if self.config.disable_queues_at_halt {
            self.regs.write32(RBQP, 1);
            self.regs.write32(TBQP, 1);
            for q in 1..MACB_MAX_QUEUES {
                self.regs.write32(gem_tbqp(q), 1);
            }
        }

        self.flags.remove(NetFlags::UP | NetFlags::RUNNING);
        self.link = None;
    }

    /// Send one frame and report what the controller did with it.
    ///
    /// Timeouts and completion faults are logged and folded into the
    /// returned [`TxOutcome`]; the ring slot of a timed-out frame stays
    /// claimed until the next halt/init cycle.
    pub fn send_frame(&mut self, packet: &[u8]) -> Result<TxOutcome, MacbDriverErr> {
        if packet.len() > TXD_FRMLEN_MASK as usize {
            return Err(MacbDriverErr::InvalidPacket);
        }

        // Map the caller's buffer for the controller to read.
        let va = VirtAddr::new(packet.as_ptr() as usize);
        self.cache
            .flush_range(va, align_up(packet.len(), DMA_MINALIGN));
        let paddr = paging::vm_to_phy(va).ok_or(MacbDriverErr::DmaMap)?;

        let idx = self
            .tx
            .post(paddr.as_usize() as u64, packet.len(), &*self.cache);

        self.regs.write32(NCR, NCR_TE | NCR_RE | NCR_TSTART);

        match self.tx.poll_completion(idx, &*self.cache, &*self.delay) {
            Some(ctrl) if ctrl & TXD_UNDERRUN != 0 => {
                log::warn!("macb: TX underrun");
                Ok(TxOutcome::Underrun)
            }
            Some(ctrl) if ctrl & TXD_BUF_EXHAUSTED != 0 => {
                log::warn!("macb: TX buffers exhausted in mid frame");
                Ok(TxOutcome::BufferExhausted)
            }
            Some(_) => Ok(TxOutcome::Completed),
            None => {
                log::warn!("macb: TX timeout");
                Ok(TxOutcome::TimedOut)
            }
        }
    }

    /// Non-blocking receive of the next complete frame.
    ///
    /// The returned slice points into the receive pool, or into the
    /// scratch buffer when the frame wrapped past the end of the ring.
    /// It stays valid until [`Macb::free_pkt`].
    pub fn recv_frame(&mut self) -> Result<&[u8], MacbDriverErr> {
        self.rx.restart_scan();

        let frame = self
            .rx
            .poll_frame(&*self.cache)
            .ok_or(MacbDriverErr::WouldBlock)?;

        self.rx
            .frame_data(&frame, &mut self.scratch)
            .ok_or(MacbDriverErr::InvalidPacket)
    }

    /// Release the frame delivered by the last [`Macb::recv_frame`] and
    /// recycle its descriptors.
    pub fn free_pkt(&mut self) {
        let new_tail = self.rx.pending_tail();
        self.rx.reclaim(new_tail, &*self.cache);
    }

    /// Program the station address filter.
    pub fn set_hwaddr(&mut self, addr: &[u8; 6]) {
        let bottom = u32::from_le_bytes([addr[0], addr[1], addr[2], addr[3]]);
        let top = u16::from_le_bytes([addr[4], addr[5]]) as u32;
        self.regs.write32(SA1B, bottom);
        self.regs.write32(SA1T, top);
    }

    fn phy_init(&mut self) -> Result<(), MacbDriverErr> {
        if let Some(fixed) = self.config.fixed_link {
            log::info!("macb: fixed link, {}Mbps", fixed.speed.mbps());
            return self.apply_link(LinkResult {
                speed: fixed.speed,
                duplex: fixed.duplex,
            });
        }

        self.phy_addr = macb_phy::phy_find(&self.regs, &*self.delay, self.phy_addr)?;

        macb_phy::wait_for_link(&self.regs, &*self.delay, self.phy_addr)?;

        let gigabit = self.gem_is_gigabit_capable() && self.phy_interface.gigabit_capable();
        let link = macb_phy::resolve_link(&self.regs, &*self.delay, self.phy_addr, gigabit)?;

        self.apply_link(link)
    }

    /// Commit a resolved speed/duplex: retune the clock tree first, then
    /// the MAC configuration register.
    fn apply_link(&mut self, link: LinkResult) -> Result<(), MacbDriverErr> {
        self.linkspd
            .link_speed_changed(&mut *self.clocks, link.speed.clk_rate_hz())?;

        let mut ncfgr = self.regs.read32(NCFGR);
        ncfgr &= !(NCFGR_SPD | NCFGR_FD | GEM_NCFGR_GBE);
        match link.speed {
            Speed::S1000 => ncfgr |= GEM_NCFGR_GBE,
            Speed::S100 => ncfgr |= NCFGR_SPD,
            Speed::S10 => {}
        }
        if link.duplex == Duplex::Full {
            ncfgr |= NCFGR_FD;
        }
        self.regs.write32(NCFGR, ncfgr);

        self.link = Some(link);
        Ok(())
    }

    fn gem_is_gigabit_capable(&self) -> bool {
        self.is_gem && !self.config.caps.contains(MacbCaps::NO_GIGABIT)
    }

    /// Program the GEM DMA configuration: buffer sizing, burst length,
    /// packet-buffer memory sizes, endianness and addressing width.
    fn configure_dma(&self) {
        let mut dmacfg = self.regs.read32(GEM_DMACFG) & !DMACFG_RXBS_MASK;
        dmacfg |= ((self.rx_buffer_size / RX_BUFFER_MULTIPLE) as u32) << DMACFG_RXBS_SHIFT;

        if self.config.dma_burst_length != 0 {
            dmacfg = (dmacfg & !DMACFG_FBLDO_MASK)
                | (self.config.dma_burst_length & DMACFG_FBLDO_MASK);
        }

        dmacfg |= DMACFG_TXPBMS | DMACFG_RXBMS_FULL;
        dmacfg &= !DMACFG_ENDIA_PKT;

        if self.regs.is_big_endian() {
            dmacfg |= DMACFG_ENDIA_DESC;
        } else {
            dmacfg &= !DMACFG_ENDIA_DESC;
        }

        dmacfg &= !DMACFG_ADDR64;
        if self.config.hw_dma_cap == HwDmaCap::U64 {
            dmacfg |= DMACFG_ADDR64;
        }

        self.regs.write32(GEM_DMACFG, dmacfg);
    }

    /// Park every extra hardware queue on the shared dummy descriptor and
    /// divide the TX SRAM segments among the enabled ones.
    fn init_multi_queues(&mut self) {
        if self.config.disable_queues_at_init {
            for q in 1..MACB_MAX_QUEUES {
                self.regs.write32(gem_tbqp(q), 1);
                self.regs.write32(gem_rbqp(q), 1);
            }
        }

        let hw_mask = self.regs.read32(GEM_DCFG6) & DCFG6_QUEUE_MASK;
        let alloc = compute_queue_allocation(hw_mask, self.config.queue_mask);
        log::debug!(
            "macb: {} queues enabled (mask {:#x})",
            alloc.num_queues,
            alloc.enabled_mask
        );

        self.dummy.init(&*self.cache);
        let paddr = self.dummy.dma_addr().as_usize() as u64;

        for q in 1..MACB_MAX_QUEUES {
            if hw_mask & (1 << q) == 0 {
                continue;
            }
            self.regs.write32(gem_tbqp(q), paddr as u32);
            self.regs.write32(gem_rbqp(q), paddr as u32);
            if self.config.hw_dma_cap == HwDmaCap::U64 {
                self.regs.write32(gem_tbqph(q), (paddr >> 32) as u32);
                self.regs.write32(gem_rbqph(q), (paddr >> 32) as u32);
            }
        }

        if self.config.allocate_segments_equally {
            self.regs.write32(GEM_SEG_ALLOC_LOWER, alloc.seg_lower);
            self.regs.write32(GEM_SEG_ALLOC_UPPER, alloc.seg_upper);
        }
    }
}

/// How the TX SRAM segments are divided among the enabled queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueAllocation {
    enabled_mask: u32,
    num_queues: u32,
    seg_lower: u32,
    seg_upper: u32,
}

fn compute_queue_allocation(hw_mask: u32, platform_mask: u32) -> QueueAllocation {
    let mut enabled = hw_mask;
    if platform_mask != 0 {
        enabled &= platform_mask;
    }
    // Bit 0 is never advertised but queue 0 always exists.
    enabled |= 0x1;

    let num_queues = enabled.count_ones();

    // Round down so the total never overflows the segment SRAM.
    let seg_per_queue = (GEM_SEGMENTS_NUM / num_queues).ilog2();

    let mut seg_lower = 0u32;
    let mut seg_upper = 0u32;
    for q in 0..MACB_MAX_QUEUES {
        if enabled & (1 << q) == 0 {
            continue;
        }
        // One 4-bit log2 field per queue, eight queues per register.
        if q < GEM_SEG_ALLOC_QUEUES_PER_REG {
            seg_lower |= seg_per_queue << (q * 4);
        } else {
            seg_upper |= seg_per_queue << ((q - GEM_SEG_ALLOC_QUEUES_PER_REG) * 4);
        }
    }

    QueueAllocation {
        enabled_mask: enabled,
        num_queues,
        seg_lower,
        seg_upper,
    }
}

fn macb_is_gem(regs: &RegBlock) -> bool {
    (regs.read32(MID) >> MID_IDNUM_SHIFT) & MID_IDNUM_MASK >= 0x2
}

/// DMA bus width to program, decoded from the maximum the design
/// supports.
fn macb_dbw(regs: &RegBlock) -> u32 {
    match (regs.read32(GEM_DCFG1) >> DCFG1_DBWDEF_SHIFT) & DCFG1_DBWDEF_MASK {
        4 => GEM_DBW128 << GEM_NCFGR_DBW_SHIFT,
        2 => GEM_DBW64 << GEM_NCFGR_DBW_SHIFT,
        _ => GEM_DBW32 << GEM_NCFGR_DBW_SHIFT,
    }
}

impl NetDevice for Macb {
    fn start(&mut self) -> Result<(), NetDevError> {
        self.init().map_err(NetDevError::from)
    }

    fn stop(&mut self) {
        self.halt();

        if self.config.disable_clocks_at_stop {
            let _ = self.clocks.disable(ClockLine::Pclk);
            let _ = self.clocks.disable(ClockLine::Hclk);
        }
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), NetDevError> {
        // Degraded outcomes were already reported; the caller gets
        // success and the next send resynchronizes.
        self.send_frame(frame)
            .map(|_| ())
            .map_err(NetDevError::from)
    }

    fn recv(&mut self) -> Result<RxPacket<'_>, NetDevError> {
        match self.recv_frame() {
            Ok(data) => Ok(RxPacket { data }),
            Err(e) => Err(NetDevError::from(e)),
        }
    }

    fn free_pkt(&mut self) {
        Macb::free_pkt(self);
    }

    fn write_hwaddr(&mut self, addr: &[u8; 6]) -> Result<(), NetDevError> {
        self.set_hwaddr(addr);
        Ok(())
    }

    fn mac_address(&self) -> [u8; 6] {
        let bottom = self.regs.read32(SA1B).to_le_bytes();
        let top = self.regs.read32(SA1T).to_le_bytes();
        [bottom[0], bottom[1], bottom[2], bottom[3], top[0], top[1]]
    }

    fn link_status(&self) -> LinkStatus {
        if !self.flags.contains(NetFlags::RUNNING) {
            return LinkStatus::Down;
        }

        match self.link {
            Some(link) => match link.duplex {
                Duplex::Full => LinkStatus::UpFullDuplex,
                Duplex::Half => LinkStatus::UpHalfDuplex,
            },
            None => LinkStatus::Down,
        }
    }

    fn link_speed(&self) -> u64 {
        self.link.map(|link| link.speed.mbps()).unwrap_or(0)
    }
}
