//! Register and descriptor definitions for the Cadence MACB/GEM.
//!
//! Registers present only on the gigabit-capable GEM variant carry a
//! `GEM_` prefix. All offsets are relative to the controller base.

// Register offsets
pub const NCR: usize = 0x0000; // Network Control
pub const NCFGR: usize = 0x0004; // Network Configuration
pub const NSR: usize = 0x0008; // Network Status
pub const GEM_DMACFG: usize = 0x0010; // DMA Configuration
pub const TSR: usize = 0x0014; // Transmit Status
pub const RBQP: usize = 0x0018; // Receive Buffer Queue Base Address
pub const TBQP: usize = 0x001c; // Transmit Buffer Queue Base Address
pub const RSR: usize = 0x0020; // Receive Status
pub const MAN: usize = 0x0034; // PHY Maintenance
pub const SA1B: usize = 0x0098; // Specific Address 1 Bottom
pub const SA1T: usize = 0x009c; // Specific Address 1 Top
pub const USRIO: usize = 0x00c0; // User I/O
pub const MID: usize = 0x00fc; // Module ID
pub const GEM_DCFG1: usize = 0x0280; // Design Configuration 1
pub const GEM_DCFG6: usize = 0x0294; // Design Configuration 6
pub const GEM_TBQPH: usize = 0x04c8; // TX queue base, upper 32 bits
pub const GEM_RBQPH: usize = 0x04d4; // RX queue base, upper 32 bits
pub const GEM_SEG_ALLOC_LOWER: usize = 0x05a0; // TX SRAM segments, queues 0-7
pub const GEM_SEG_ALLOC_UPPER: usize = 0x05a4; // TX SRAM segments, queues 8-15

/// TX descriptor queue base of queue `q` (`q >= 1`; queue 0 uses TBQP).
pub const fn gem_tbqp(q: usize) -> usize {
    0x0440 + ((q - 1) << 2)
}

/// RX descriptor queue base of queue `q` (`q >= 1`; queue 0 uses RBQP).
pub const fn gem_rbqp(q: usize) -> usize {
    0x0480 + ((q - 1) << 2)
}

/// Upper 32 address bits of queue `q`'s TX base (`q >= 1`).
pub const fn gem_tbqph(q: usize) -> usize {
    GEM_TBQPH + (q << 2)
}

/// Upper 32 address bits of queue `q`'s RX base (`q >= 1`).
pub const fn gem_rbqph(q: usize) -> usize {
    GEM_RBQPH + (q << 2)
}

// NCR bits
pub const NCR_RE: u32 = 1 << 2; // Receive enable
pub const NCR_TE: u32 = 1 << 3; // Transmit enable
pub const NCR_MPE: u32 = 1 << 4; // Management port enable
pub const NCR_CLRSTAT: u32 = 1 << 5; // Clear statistics registers
pub const NCR_TSTART: u32 = 1 << 9; // Start transmission
pub const NCR_THALT: u32 = 1 << 10; // Halt transmission after current frame

// NCFGR bits
pub const NCFGR_SPD: u32 = 1 << 0; // 100Mbps (vs 10Mbps)
pub const NCFGR_FD: u32 = 1 << 1; // Full duplex
pub const GEM_NCFGR_GBE: u32 = 1 << 10; // Gigabit mode
pub const GEM_NCFGR_PCSSEL: u32 = 1 << 11; // PCS select
pub const GEM_NCFGR_SGMIIEN: u32 = 1 << 27; // SGMII mode

pub const MACB_NCFGR_CLK_SHIFT: u32 = 10;
pub const MACB_CLK_DIV8: u32 = 0;
pub const MACB_CLK_DIV16: u32 = 1;
pub const MACB_CLK_DIV32: u32 = 2;
pub const MACB_CLK_DIV64: u32 = 3;

pub const GEM_NCFGR_CLK_SHIFT: u32 = 18;
pub const GEM_CLK_DIV8: u32 = 0;
pub const GEM_CLK_DIV16: u32 = 1;
pub const GEM_CLK_DIV32: u32 = 2;
pub const GEM_CLK_DIV48: u32 = 3;
pub const GEM_CLK_DIV64: u32 = 4;
pub const GEM_CLK_DIV96: u32 = 5;
pub const GEM_CLK_DIV128: u32 = 6;
pub const GEM_CLK_DIV224: u32 = 7;

pub const GEM_NCFGR_DBW_SHIFT: u32 = 21;
pub const GEM_DBW32: u32 = 0;
pub const GEM_DBW64: u32 = 1;
pub const GEM_DBW128: u32 = 2;

// NSR bits
pub const NSR_IDLE: u32 = 1 << 2; // PHY management logic idle

// TSR bits
pub const TSR_TGO: u32 = 1 << 3; // Transmit active

// DMACFG bits (GEM)
pub const DMACFG_FBLDO_MASK: u32 = 0x1f; // Fixed burst length
pub const DMACFG_ENDIA_PKT: u32 = 1 << 6; // Endianness of packet data
pub const DMACFG_ENDIA_DESC: u32 = 1 << 7; // Endianness of descriptors
pub const DMACFG_RXBMS_SHIFT: u32 = 8; // RX packet buffer memory size
pub const DMACFG_RXBMS_FULL: u32 = 0x3 << DMACFG_RXBMS_SHIFT;
pub const DMACFG_TXPBMS: u32 = 1 << 10; // TX packet buffer memory size
pub const DMACFG_RXBS_SHIFT: u32 = 16; // RX buffer size / 64
pub const DMACFG_RXBS_MASK: u32 = 0xff << DMACFG_RXBS_SHIFT;
pub const DMACFG_ADDR64: u32 = 1 << 30; // 64-bit descriptor addressing

// MAN fields
pub const MAN_DATA_MASK: u32 = 0xffff;
pub const MAN_CODE_SHIFT: u32 = 16;
pub const MAN_REGA_SHIFT: u32 = 18;
pub const MAN_PHYA_SHIFT: u32 = 23;
pub const MAN_RW_SHIFT: u32 = 28;
pub const MAN_SOF_SHIFT: u32 = 30;

pub const MAN_RW_WRITE: u32 = 1;
pub const MAN_RW_READ: u32 = 2;

/// Encode a clause-22 PHY maintenance frame.
pub const fn man_frame(rw: u32, phy_addr: u8, reg: u8, data: u16) -> u32 {
    (1 << MAN_SOF_SHIFT)
        | (rw << MAN_RW_SHIFT)
        | (((phy_addr & 0x1f) as u32) << MAN_PHYA_SHIFT)
        | (((reg & 0x1f) as u32) << MAN_REGA_SHIFT)
        | (2 << MAN_CODE_SHIFT)
        | data as u32
}

/// Data field of a completed PHY maintenance frame.
pub const fn man_data(frame: u32) -> u16 {
    (frame & MAN_DATA_MASK) as u16
}

// MID fields
pub const MID_IDNUM_SHIFT: u32 = 16;
pub const MID_IDNUM_MASK: u32 = 0xfff;

// DCFG1 fields
pub const DCFG1_DBWDEF_SHIFT: u32 = 25;
pub const DCFG1_DBWDEF_MASK: u32 = 0x7;

// DCFG6 fields
pub const DCFG6_DAW64: u32 = 1 << 23; // 64-bit addressing supported
pub const DCFG6_QUEUE_MASK: u32 = 0xffff; // one bit per supported queue

// RX descriptor, address word
pub const RXD_USED: u32 = 1 << 0; // written by the controller on receive
pub const RXD_WRAP: u32 = 1 << 1; // last descriptor in the ring

// RX descriptor, control/status word
pub const RXD_FRMLEN_MASK: u32 = 0x0000_0fff;
pub const RXD_SOF: u32 = 1 << 14; // first buffer of the frame
pub const RXD_EOF: u32 = 1 << 15; // last buffer of the frame

// TX descriptor, control/status word
pub const TXD_FRMLEN_MASK: u32 = 0x0000_07ff;
pub const TXD_LAST: u32 = 1 << 15; // last buffer of the frame
pub const TXD_BUF_EXHAUSTED: u32 = 1 << 27; // ran out of buffers mid-frame
pub const TXD_UNDERRUN: u32 = 1 << 28;
pub const TXD_WRAP: u32 = 1 << 30; // last descriptor in the ring
pub const TXD_USED: u32 = 1 << 31; // owned by software

// Ring geometry. Sizes are fixed at build time; the controller is told
// where the rings start, never how long they are.
pub const MACB_RX_RING_SIZE: usize = 32;
pub const MACB_TX_RING_SIZE: usize = 16;

/// Bytes reserved per logical descriptor: one 8-byte record in 32-bit
/// addressing, two (address-low/control + address-high/reserved) in
/// 64-bit addressing.
pub const DMA_DESC_SIZE: usize = 16;

// Receive buffer geometry. Sizes must be a power of two and divisible by
// RX_BUFFER_MULTIPLE.
pub const MACB_RX_BUFFER_SIZE: usize = 128;
pub const GEM_RX_BUFFER_SIZE: usize = 2048;
pub const RX_BUFFER_MULTIPLE: usize = 64;

// Poll bounds (iteration counts, not wall-clock)
pub const MACB_TX_TIMEOUT: u32 = 1000;
pub const MACB_AUTONEG_TIMEOUT: u32 = 5_000_000;

// Multi-queue geometry
pub const MACB_MAX_QUEUES: usize = 16;

/// TX packet-buffer SRAM segments shared by all queues.
pub const GEM_SEGMENTS_NUM: u32 = 16;

/// Queues whose 4-bit segment field lives in the lower allocation
/// register; the rest go in the upper one.
pub const GEM_SEG_ALLOC_QUEUES_PER_REG: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn man_frame_encoding() {
        let frame = man_frame(MAN_RW_READ, 0x03, 0x02, 0);
        assert_eq!(frame >> MAN_SOF_SHIFT, 1);
        assert_eq!((frame >> MAN_RW_SHIFT) & 0x3, 2);
        assert_eq!((frame >> MAN_PHYA_SHIFT) & 0x1f, 3);
        assert_eq!((frame >> MAN_REGA_SHIFT) & 0x1f, 2);
        assert_eq!((frame >> MAN_CODE_SHIFT) & 0x3, 2);

        let frame = man_frame(MAN_RW_WRITE, 31, 31, 0xbeef);
        assert_eq!((frame >> MAN_RW_SHIFT) & 0x3, 1);
        assert_eq!((frame >> MAN_PHYA_SHIFT) & 0x1f, 31);
        assert_eq!((frame >> MAN_REGA_SHIFT) & 0x1f, 31);
        assert_eq!(man_data(frame), 0xbeef);
    }

    #[test]
    fn queue_register_spacing() {
        assert_eq!(gem_tbqp(1), 0x0440);
        assert_eq!(gem_tbqp(2), 0x0444);
        assert_eq!(gem_rbqp(1), 0x0480);
        assert_eq!(gem_rbqp(15), 0x0480 + 14 * 4);
    }
}
