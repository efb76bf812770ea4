//! Ethernet framing constants.

pub const ETHER_ADDR_LEN: usize = 6;
pub const ETHER_HDR_LEN: usize = 14;
pub const ETHER_CRC_LEN: usize = 4;

/// Maximum untagged frame length on the wire.
pub const ETHER_MAX_LEN: usize = 1518;

/// Maximum frame length including a VLAN tag.
pub const PKTSIZE: usize = 1522;

/// [`PKTSIZE`] rounded up to [`PKTALIGN`]; the size of a linear packet
/// buffer able to hold any frame.
pub const PKTSIZE_ALIGN: usize = 1536;

/// Alignment of packet buffers and of every cache-maintenance range that
/// covers them.
pub const PKTALIGN: usize = 32;
