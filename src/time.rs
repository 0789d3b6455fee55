// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Clock and sleep operations expressed in POSIX time units.

use tracing::trace;

use crate::host::{ClockProvider as _, Provider, TimerError, TimerProvider as _};
use crate::winposix::WinPosix;

/// Microseconds between the host epoch (1601) and the POSIX epoch (1970).
const EPOCH_DELTA_US: u64 = 11_644_473_600_000_000;

/// Seconds and nanoseconds, as in `struct timespec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timespec {
    pub tv_sec: i64,
    pub tv_nsec: i64,
}

impl Timespec {
    pub const ZERO: Timespec = Timespec { tv_sec: 0, tv_nsec: 0 };
}

/// Seconds and microseconds, as in `struct timeval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeval {
    pub tv_sec: i64,
    pub tv_usec: i64,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SleepError {
    /// The request held a negative or out-of-range field, as for `EINVAL`.
    #[error("sleep request out of range")]
    InvalidArgument,
    #[error(transparent)]
    TimerFault(#[from] TimerError),
}

impl<Host: Provider, Children, Descriptors> WinPosix<Host, Children, Descriptors> {
    /// Suspends the caller for roughly the given number of microseconds.
    ///
    /// The host sleeps at millisecond granularity, so sub-millisecond
    /// requests round down to an immediate return.
    pub fn usleep(&self, microseconds: u32) {
        self.host.sleep_ms(u64::from(microseconds) / 1000);
    }

    /// Suspends the caller for the duration in `request` using a waitable
    /// timer, at 100ns granularity.
    ///
    /// The wait cannot be interrupted, so on success the remaining time is
    /// always zero.
    pub fn nanosleep(&self, request: &Timespec) -> Result<Timespec, SleepError> {
        if request.tv_sec < 0 || request.tv_nsec < 0 || request.tv_nsec > 999_999_999 {
            return Err(SleepError::InvalidArgument);
        }
        let ticks = request
            .tv_sec
            .saturating_mul(10_000_000)
            .saturating_add(request.tv_nsec / 100);
        trace!(ticks, "nanosleep");
        let timer = self.host.create_waitable_timer()?;
        self.host.arm(&timer, ticks)?;
        self.host.wait(&timer)?;
        Ok(Timespec::ZERO)
    }

    /// Reads the wall clock as seconds and microseconds since the POSIX
    /// epoch.
    pub fn gettimeofday(&self) -> Timeval {
        let microseconds = (self.host.current_time().0 / 10).saturating_sub(EPOCH_DELTA_US);
        Timeval {
            tv_sec: (microseconds / 1_000_000) as i64,
            tv_usec: (microseconds % 1_000_000) as i64,
        }
    }
}
