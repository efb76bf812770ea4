//! The interface a polled Ethernet driver exposes upward.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NetFlags: u16 {
        const UP = 1 << 0; // interface is up
        const RUNNING = 1 << 6; // resources allocated, controller enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Up,
    UpFullDuplex,
    UpHalfDuplex,
    Down,
    Unknown,
}

impl core::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinkStatus::Up => write!(f, "Up"),
            LinkStatus::UpFullDuplex => write!(f, "Up (Full Duplex)"),
            LinkStatus::UpHalfDuplex => write!(f, "Up (Half Duplex)"),
            LinkStatus::Down => write!(f, "Down"),
            LinkStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetDevError {
    /// No controller answered, or no PHY was found on the management bus.
    NoDevice,
    /// Link negotiation did not complete.
    LinkDown,
    /// Unsupported or missing interface configuration.
    InvalidConfig,
    /// A bounded hardware wait expired.
    Timeout,
    /// No complete frame is available right now; poll again later.
    WouldBlock,
    /// DMA memory allocation failed.
    OutOfMemory,
    /// The device rejected an operation.
    DeviceError,
}

impl core::fmt::Display for NetDevError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::NoDevice => write!(f, "no device or no PHY present"),
            Self::LinkDown => write!(f, "link negotiation did not complete"),
            Self::InvalidConfig => write!(f, "invalid interface configuration"),
            Self::Timeout => write!(f, "hardware wait timed out"),
            Self::WouldBlock => write!(f, "no packet available"),
            Self::OutOfMemory => write!(f, "DMA memory exhausted"),
            Self::DeviceError => write!(f, "device error"),
        }
    }
}

/// A received frame.
///
/// Borrows the driver's receive storage; the borrow ends before the caller
/// can release the frame with [`NetDevice::free_pkt`], which recycles the
/// descriptors that carried it.
#[derive(Debug)]
pub struct RxPacket<'a> {
    pub data: &'a [u8],
}

/// A polled Ethernet device driven from a single execution context.
///
/// No operation blocks indefinitely: sends wait a bounded number of poll
/// attempts for completion and receives return [`NetDevError::WouldBlock`]
/// when nothing has arrived.
pub trait NetDevice {
    fn start(&mut self) -> Result<(), NetDevError>;
    fn stop(&mut self);

    /// Send one frame, returning once the controller has taken it (or the
    /// completion wait expired).
    fn send(&mut self, frame: &[u8]) -> Result<(), NetDevError>;

    /// Non-blocking receive of the next complete frame.
    fn recv(&mut self) -> Result<RxPacket<'_>, NetDevError>;

    /// Release the most recently received frame back to the receive ring.
    fn free_pkt(&mut self);

    fn write_hwaddr(&mut self, addr: &[u8; 6]) -> Result<(), NetDevError>;
    fn mac_address(&self) -> [u8; 6];

    fn link_status(&self) -> LinkStatus;

    /// Negotiated link speed in Mbps, 0 when the link is down.
    fn link_speed(&self) -> u64;
}
