//! PHY management over the controller's MDIO interface: discovery,
//! autonegotiation and link resolution.

use macb_lib::{
    delay::{retry, Delay},
    mmio::RegBlock,
};

use super::{
    macb_regs::*,
    mii::{self, *},
    MacbDriverErr,
};

/// Attempts to wait for the PHY maintenance logic to go idle.
const MACB_MDIO_TIMEOUT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    S10,
    S100,
    S1000,
}

impl Speed {
    pub fn mbps(self) -> u64 {
        match self {
            Speed::S10 => 10,
            Speed::S100 => 100,
            Speed::S1000 => 1000,
        }
    }

    /// Transmit clock rate the MAC needs at this speed.
    pub fn clk_rate_hz(self) -> u64 {
        match self {
            Speed::S10 => 2_500_000,
            Speed::S100 => 25_000_000,
            Speed::S1000 => 125_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplex {
    Half,
    Full,
}

impl Duplex {
    fn as_str(self) -> &'static str {
        match self {
            Duplex::Half => "half",
            Duplex::Full => "full",
        }
    }
}

/// Resolved link parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkResult {
    pub speed: Speed,
    pub duplex: Duplex,
}

fn mdio_wait_idle(regs: &RegBlock, delay: &dyn Delay) -> Result<(), MacbDriverErr> {
    retry(MACB_MDIO_TIMEOUT, 1, delay, || {
        (regs.read32(NSR) & NSR_IDLE != 0).then_some(())
    })
    .ok_or(MacbDriverErr::MdioTimeout)
}

pub(crate) fn mdio_write(
    regs: &RegBlock,
    delay: &dyn Delay,
    phy_addr: u8,
    reg: u8,
    value: u16,
) -> Result<(), MacbDriverErr> {
    regs.setbits(NCR, NCR_MPE);
    regs.write32(MAN, man_frame(MAN_RW_WRITE, phy_addr, reg, value));
    let result = mdio_wait_idle(regs, delay);
    regs.clrbits(NCR, NCR_MPE);
    result
}

pub(crate) fn mdio_read(
    regs: &RegBlock,
    delay: &dyn Delay,
    phy_addr: u8,
    reg: u8,
) -> Result<u16, MacbDriverErr> {
    regs.setbits(NCR, NCR_MPE);
    regs.write32(MAN, man_frame(MAN_RW_READ, phy_addr, reg, 0));
    let result = mdio_wait_idle(regs, delay);
    let frame = regs.read32(MAN);
    regs.clrbits(NCR, NCR_MPE);
    result.map(|_| man_data(frame))
}

/// Locate the PHY: the pinned address is tried first, then the whole
/// management bus is scanned.
pub(crate) fn phy_find(
    regs: &RegBlock,
    delay: &dyn Delay,
    pinned: u8,
) -> Result<u8, MacbDriverErr> {
    let phy_id = mdio_read(regs, delay, pinned, MII_PHYSID1)?;
    if phy_id != 0xffff {
        log::info!("macb: PHY present at {}", pinned);
        return Ok(pinned);
    }

    for addr in 0..32u8 {
        if let Ok(phy_id) = mdio_read(regs, delay, addr, MII_PHYSID1) {
            if phy_id != 0xffff {
                log::info!("macb: PHY present at {}", addr);
                return Ok(addr);
            }
        }
    }

    log::error!("macb: PHY not found");
    Err(MacbDriverErr::NoPhy)
}

/// Advertise everything we support and restart autonegotiation, then wait
/// a bounded number of polls for it to complete. A timeout here is
/// reported but not fatal; the link wait below makes the call.
fn restart_autoneg(regs: &RegBlock, delay: &dyn Delay, phy_addr: u8) -> Result<(), MacbDriverErr> {
    mdio_write(
        regs,
        delay,
        phy_addr,
        MII_ADVERTISE,
        ADVERTISE_CSMA | ADVERTISE_ALL,
    )?;
    log::info!("macb: starting autonegotiation");
    mdio_write(
        regs,
        delay,
        phy_addr,
        MII_BMCR,
        BMCR_ANENABLE | BMCR_ANRESTART,
    )?;

    let completed = retry(MACB_AUTONEG_TIMEOUT / 100, 100, delay, || {
        match mdio_read(regs, delay, phy_addr, MII_BMSR) {
            Ok(status) if status & BMSR_ANEGCOMPLETE != 0 => Some(status),
            _ => None,
        }
    });

    match completed {
        Some(_) => log::info!("macb: autonegotiation complete"),
        None => log::warn!("macb: autonegotiation timed out"),
    }

    Ok(())
}

/// Make sure the PHY reports an established link, renegotiating when it
/// does not.
pub(crate) fn wait_for_link(
    regs: &RegBlock,
    delay: &dyn Delay,
    phy_addr: u8,
) -> Result<(), MacbDriverErr> {
    let status = mdio_read(regs, delay, phy_addr, MII_BMSR)?;
    if status & BMSR_LSTATUS != 0 {
        return Ok(());
    }

    restart_autoneg(regs, delay, phy_addr)?;

    let linked = retry(MACB_AUTONEG_TIMEOUT / 100, 100, delay, || {
        match mdio_read(regs, delay, phy_addr, MII_BMSR) {
            Ok(status) if status & BMSR_LSTATUS != 0 => Some(Ok(())),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        }
    });

    match linked {
        Some(Ok(())) => {
            // Settle after link-up so the first transfer does not fail.
            delay.wait_millisec(10);
            Ok(())
        }
        Some(Err(e)) => Err(e),
        None => {
            log::warn!("macb: link down");
            Err(MacbDriverErr::LinkDown)
        }
    }
}

/// Resolve speed and duplex from the link partner's ability registers,
/// preferring gigabit when both ends can do it.
pub(crate) fn resolve_link(
    regs: &RegBlock,
    delay: &dyn Delay,
    phy_addr: u8,
    gigabit: bool,
) -> Result<LinkResult, MacbDriverErr> {
    if gigabit {
        let lpa = mdio_read(regs, delay, phy_addr, MII_STAT1000)?;

        if lpa & (LPA_1000FULL | LPA_1000HALF | LPA_1000XFULL | LPA_1000XHALF) != 0 {
            let duplex = if lpa & (LPA_1000FULL | LPA_1000XFULL) != 0 {
                Duplex::Full
            } else {
                Duplex::Half
            };

            log::info!(
                "macb: link up, 1000Mbps {}-duplex (lpa: {:#06x})",
                duplex.as_str(),
                lpa
            );
            return Ok(LinkResult {
                speed: Speed::S1000,
                duplex,
            });
        }
    }

    // 10/100 resolution from the advertisement intersection.
    let adv = mdio_read(regs, delay, phy_addr, MII_ADVERTISE)?;
    let lpa = mdio_read(regs, delay, phy_addr, MII_LPA)?;
    let media = mii::nway_result(adv & lpa);

    let speed = if media & (ADVERTISE_100FULL | ADVERTISE_100HALF) != 0 {
        Speed::S100
    } else {
        Speed::S10
    };
    let duplex = if media & ADVERTISE_FULL != 0 {
        Duplex::Full
    } else {
        Duplex::Half
    };

    log::info!(
        "macb: link up, {}Mbps {}-duplex (lpa: {:#06x})",
        speed.mbps(),
        duplex.as_str(),
        lpa
    );

    Ok(LinkResult { speed, duplex })
}

/// MDC divider field of NCFGR for the given peripheral clock rate. The
/// GEM exposes the extended divider table.
pub(crate) fn mdc_clk_div(is_gem: bool, pclk_hz: u64) -> u32 {
    if is_gem {
        let div = if pclk_hz < 20_000_000 {
            GEM_CLK_DIV8
        } else if pclk_hz < 40_000_000 {
            GEM_CLK_DIV16
        } else if pclk_hz < 80_000_000 {
            GEM_CLK_DIV32
        } else if pclk_hz < 120_000_000 {
            GEM_CLK_DIV48
        } else if pclk_hz < 160_000_000 {
            GEM_CLK_DIV64
        } else if pclk_hz < 240_000_000 {
            GEM_CLK_DIV96
        } else if pclk_hz < 320_000_000 {
            GEM_CLK_DIV128
        } else {
            GEM_CLK_DIV224
        };

        div << GEM_NCFGR_CLK_SHIFT
    } else {
        let div = if pclk_hz < 20_000_000 {
            MACB_CLK_DIV8
        } else if pclk_hz < 40_000_000 {
            MACB_CLK_DIV16
        } else if pclk_hz < 80_000_000 {
            MACB_CLK_DIV32
        } else {
            MACB_CLK_DIV64
        };

        div << MACB_NCFGR_CLK_SHIFT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct CountingDelay(Cell<u32>);

    impl Delay for CountingDelay {
        fn wait_microsec(&self, _usec: u64) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn fake_regs() -> RegBlock {
        let mem = vec![0u32; 0x600 / 4].leak();
        unsafe { RegBlock::new(mem.as_mut_ptr() as usize, false) }
    }

    #[test]
    fn speed_to_clock_rate_mapping() {
        assert_eq!(Speed::S10.clk_rate_hz(), 2_500_000);
        assert_eq!(Speed::S100.clk_rate_hz(), 25_000_000);
        assert_eq!(Speed::S1000.clk_rate_hz(), 125_000_000);
    }

    #[test]
    fn gem_divider_table() {
        let div = |hz| mdc_clk_div(true, hz) >> GEM_NCFGR_CLK_SHIFT;
        assert_eq!(div(10_000_000), GEM_CLK_DIV8);
        assert_eq!(div(25_000_000), GEM_CLK_DIV16);
        assert_eq!(div(45_000_000), GEM_CLK_DIV32);
        assert_eq!(div(100_000_000), GEM_CLK_DIV48);
        assert_eq!(div(130_000_000), GEM_CLK_DIV64);
        assert_eq!(div(200_000_000), GEM_CLK_DIV96);
        assert_eq!(div(300_000_000), GEM_CLK_DIV128);
        assert_eq!(div(500_000_000), GEM_CLK_DIV224);
    }

    #[test]
    fn macb_divider_table() {
        let div = |hz| mdc_clk_div(false, hz) >> MACB_NCFGR_CLK_SHIFT;
        assert_eq!(div(10_000_000), MACB_CLK_DIV8);
        assert_eq!(div(25_000_000), MACB_CLK_DIV16);
        assert_eq!(div(45_000_000), MACB_CLK_DIV32);
        assert_eq!(div(100_000_000), MACB_CLK_DIV64);
    }

    #[test]
    fn mdio_write_encodes_a_maintenance_frame() {
        let regs = fake_regs();
        regs.write32(NSR, NSR_IDLE);

        let delay = CountingDelay(Cell::new(0));
        mdio_write(&regs, &delay, 7, MII_BMCR, 0x1234).unwrap();

        let frame = regs.read32(MAN);
        assert_eq!((frame >> MAN_RW_SHIFT) & 0x3, MAN_RW_WRITE);
        assert_eq!((frame >> MAN_PHYA_SHIFT) & 0x1f, 7);
        assert_eq!((frame >> MAN_REGA_SHIFT) & 0x1f, MII_BMCR as u32);
        assert_eq!(man_data(frame), 0x1234);

        // The management port is switched off again afterwards.
        assert_eq!(regs.read32(NCR) & NCR_MPE, 0);
    }

    #[test]
    fn mdio_gives_up_when_the_port_never_idles() {
        let regs = fake_regs();

        let delay = CountingDelay(Cell::new(0));
        let err = mdio_read(&regs, &delay, 0, MII_BMSR).unwrap_err();

        assert_eq!(err, MacbDriverErr::MdioTimeout);
        assert_eq!(delay.0.get(), MACB_MDIO_TIMEOUT);
    }

    #[test]
    fn phy_find_prefers_the_pinned_address() {
        let regs = fake_regs();
        regs.write32(NSR, NSR_IDLE);

        let delay = CountingDelay(Cell::new(0));
        assert_eq!(phy_find(&regs, &delay, 5), Ok(5));
    }
}
