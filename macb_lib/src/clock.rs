//! Clock control capability.
//!
//! The controller consumes a handful of named clock lines. How they are
//! gated and tuned is a platform concern (clock tree, firmware calls), so
//! the driver only sees this trait. [`NullClock`] serves platforms whose
//! clocks are set up before the driver runs.

/// Clock lines a MAC controller consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockLine {
    /// Peripheral (register) clock.
    Pclk,
    /// AHB/AXI bus clock.
    Hclk,
    /// Transmit reference clock, retuned on every link-speed change.
    TxClk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The platform has no such clock line.
    NoSuchClock,
    /// The clock exists but the requested operation is not available.
    Unsupported,
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::NoSuchClock => write!(f, "no such clock line"),
            Self::Unsupported => write!(f, "operation not supported by the clock line"),
        }
    }
}

pub trait ClockCtl {
    fn enable(&mut self, line: ClockLine) -> Result<(), ClockError>;
    fn disable(&mut self, line: ClockLine) -> Result<(), ClockError>;

    /// Current rate of `line` in Hz.
    fn rate(&self, line: ClockLine) -> Result<u64, ClockError>;

    /// Change the rate of `line`; returns the rate actually programmed.
    fn set_rate(&mut self, line: ClockLine, rate_hz: u64) -> Result<u64, ClockError>;
}

/// Platforms without driver-controllable clocks.
pub struct NullClock;

impl ClockCtl for NullClock {
    fn enable(&mut self, _line: ClockLine) -> Result<(), ClockError> {
        Ok(())
    }

    fn disable(&mut self, _line: ClockLine) -> Result<(), ClockError> {
        Ok(())
    }

    fn rate(&self, _line: ClockLine) -> Result<u64, ClockError> {
        Err(ClockError::NoSuchClock)
    }

    fn set_rate(&mut self, _line: ClockLine, _rate_hz: u64) -> Result<u64, ClockError> {
        Err(ClockError::NoSuchClock)
    }
}

/// Strategy invoked when link negotiation resolves a speed.
///
/// Injected at construction; the default retunes the transmit clock.
/// Platforms that route the transmit clock through firmware or a glue
/// register supply their own implementation.
pub trait LinkSpeedHook {
    fn link_speed_changed(
        &mut self,
        clocks: &mut dyn ClockCtl,
        rate_hz: u64,
    ) -> Result<(), ClockError>;
}

/// Default link-speed strategy: set the transmit clock rate, ignoring
/// platforms that do not expose one.
pub struct TxClkRate;

impl LinkSpeedHook for TxClkRate {
    fn link_speed_changed(
        &mut self,
        clocks: &mut dyn ClockCtl,
        rate_hz: u64,
    ) -> Result<(), ClockError> {
        match clocks.set_rate(ClockLine::TxClk, rate_hz) {
            Ok(_) => Ok(()),
            Err(ClockError::NoSuchClock) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hook_tolerates_missing_tx_clock() {
        let mut clocks = NullClock;
        assert_eq!(TxClkRate.link_speed_changed(&mut clocks, 125_000_000), Ok(()));
    }

    struct FixedRate(u64);

    impl ClockCtl for FixedRate {
        fn enable(&mut self, _line: ClockLine) -> Result<(), ClockError> {
            Ok(())
        }

        fn disable(&mut self, _line: ClockLine) -> Result<(), ClockError> {
            Ok(())
        }

        fn rate(&self, _line: ClockLine) -> Result<u64, ClockError> {
            Ok(self.0)
        }

        fn set_rate(&mut self, _line: ClockLine, rate_hz: u64) -> Result<u64, ClockError> {
            self.0 = rate_hz;
            Ok(rate_hz)
        }
    }

    #[test]
    fn default_hook_programs_the_tx_clock() {
        let mut clocks = FixedRate(0);
        TxClkRate
            .link_speed_changed(&mut clocks, 25_000_000)
            .unwrap();
        assert_eq!(clocks.rate(ClockLine::TxClk), Ok(25_000_000));
    }
}
