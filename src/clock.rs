//! Shared clock source: one timerfd drives every polling-mode widget.
//!
//! The default policy is strictly 1 Hz; widgets with longer periods act on
//! every Nth tick instead of reconfiguring the shared timer.

use std::os::unix::io::{AsFd, AsRawFd, RawFd};

use anyhow::{Context, Result, bail};
use nix::errno::Errno;
use nix::sys::time::TimeSpec;
use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};
use nix::unistd;
use tracing::warn;

pub struct Clock {
    timer: TimerFd,
}

impl Clock {
    /// Create a monotonic 1 Hz timer, first expiration one second from now.
    pub fn new() -> Result<Self> {
        let timer = TimerFd::new(
            ClockId::CLOCK_MONOTONIC,
            TimerFlags::TFD_NONBLOCK | TimerFlags::TFD_CLOEXEC,
        )
        .context("failed to create timerfd")?;
        let clock = Self { timer };
        clock.set_period(1)?;
        Ok(clock)
    }

    pub fn fd(&self) -> RawFd {
        self.timer.as_fd().as_raw_fd()
    }

    /// Reconfigure the tick interval. Unused by the default policy but kept
    /// for embedders that want a coarser base rate.
    pub fn set_period(&self, seconds: u64) -> Result<()> {
        if seconds == 0 {
            bail!("clock period must be positive");
        }
        self.timer
            .set(
                Expiration::Interval(TimeSpec::new(seconds as i64, 0)),
                TimerSetTimeFlags::empty(),
            )
            .context("failed to arm timerfd")
    }

    /// Drain the elapsed tick count. Delivery may coalesce several intervals
    /// into one wakeup; the returned count carries them all. Returns 0 when
    /// nothing has expired.
    pub fn read(&self) -> u64 {
        let mut buf = [0u8; 8];
        match unistd::read(self.fd(), &mut buf) {
            Ok(8) => u64::from_ne_bytes(buf),
            Ok(n) => {
                warn!(n, "short read from timerfd");
                0
            }
            Err(Errno::EAGAIN) => 0,
            Err(err) => {
                warn!(%err, "failed to read timerfd");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_clock_has_no_pending_ticks() {
        let clock = Clock::new().unwrap();
        assert_eq!(clock.read(), 0);
    }

    #[test]
    fn zero_period_is_rejected() {
        let clock = Clock::new().unwrap();
        assert!(clock.set_period(0).is_err());
        assert!(clock.set_period(5).is_ok());
    }

    #[test]
    fn drains_coalesced_expirations() {
        let clock = Clock::new().unwrap();
        // 1 ms interval, sleep long enough to queue several expirations.
        clock
            .timer
            .set(
                Expiration::Interval(TimeSpec::new(0, 1_000_000)),
                TimerSetTimeFlags::empty(),
            )
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(25));
        assert!(clock.read() > 1);
        // Drained: immediately reading again yields nothing or a fresh tick.
        assert!(clock.read() <= 1);
    }
}
