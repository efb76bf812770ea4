//! Busy-wait delays and the bounded poll loop used for all hardware waits.
//!
//! The driver never sleeps; every wait is a fixed number of poll attempts
//! with a short delay between them, so no operation can hang even when the
//! hardware misbehaves. The delay source is injected, which lets tests run
//! the full timeout path without consuming wall-clock time.

pub trait Delay {
    /// Wait roughly `usec` microseconds.
    fn wait_microsec(&self, usec: u64);

    /// Wait roughly `msec` milliseconds.
    fn wait_millisec(&self, msec: u64) {
        self.wait_microsec(msec * 1000);
    }

    /// Pause a CPU during a busy loop to reduce power consumption.
    fn pause(&self) {
        core::hint::spin_loop();
    }
}

/// Calibration-free delay for platforms without a usable timer.
///
/// Spins a fixed number of hint instructions per microsecond. The default
/// is deliberately conservative; platforms with a known core clock pass
/// their own factor.
pub struct SpinDelay {
    spins_per_usec: u32,
}

impl SpinDelay {
    pub const fn new(spins_per_usec: u32) -> Self {
        SpinDelay { spins_per_usec }
    }
}

impl Default for SpinDelay {
    fn default() -> Self {
        SpinDelay::new(100)
    }
}

impl Delay for SpinDelay {
    fn wait_microsec(&self, usec: u64) {
        for _ in 0..usec.saturating_mul(self.spins_per_usec as u64) {
            core::hint::spin_loop();
        }
    }
}

/// Poll `poll` up to `max_attempts` times, waiting `interval_usec` between
/// attempts.
///
/// Returns the first `Some` produced by `poll`, or `None` once the
/// attempts are spent. The bound is an iteration count, not a wall-clock
/// duration.
pub fn retry<T>(
    max_attempts: u32,
    interval_usec: u64,
    delay: &dyn Delay,
    mut poll: impl FnMut() -> Option<T>,
) -> Option<T> {
    for _ in 0..max_attempts {
        if let Some(v) = poll() {
            return Some(v);
        }
        delay.wait_microsec(interval_usec);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct CountingDelay {
        calls: Cell<u32>,
    }

    impl Delay for CountingDelay {
        fn wait_microsec(&self, _usec: u64) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    #[test]
    fn retry_stops_after_exactly_the_bound() {
        let delay = CountingDelay { calls: Cell::new(0) };
        let mut polls = 0u32;

        let result: Option<()> = retry(1000, 1, &delay, || {
            polls += 1;
            None
        });

        assert!(result.is_none());
        assert_eq!(polls, 1000);
        assert_eq!(delay.calls.get(), 1000);
    }

    #[test]
    fn retry_returns_early_on_success() {
        let delay = CountingDelay { calls: Cell::new(0) };
        let mut polls = 0u32;

        let result = retry(1000, 1, &delay, || {
            polls += 1;
            (polls == 3).then_some(polls)
        });

        assert_eq!(result, Some(3));
        assert_eq!(delay.calls.get(), 2);
    }
}
