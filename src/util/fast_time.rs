//! Monotonic timing for block reads
//!
//! Reads are timed with direct `clock_gettime(CLOCK_MONOTONIC)` calls. The
//! [`Stopwatch`] accumulates only the time spent between `start` and `stop`, so
//! seeks and cancellation checks between reads never count toward a lap.

use std::time::Duration;

/// Timestamp from CLOCK_MONOTONIC with nanosecond resolution
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FastInstant {
    nanos: u64,
}

impl FastInstant {
    #[inline(always)]
    pub fn now() -> Self {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // SAFETY: ts is a valid timespec; CLOCK_MONOTONIC is always available on Linux
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
        }

        let nanos = (ts.tv_sec as u64) * 1_000_000_000 + (ts.tv_nsec as u64);

        Self { nanos }
    }

    #[inline(always)]
    pub fn duration_since(&self, earlier: FastInstant) -> Duration {
        let nanos = self.nanos.saturating_sub(earlier.nanos);
        Duration::from_nanos(nanos)
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        Self::now().duration_since(*self)
    }
}

/// Accumulating stopwatch
///
/// `elapsed()` is the sum of all completed start/stop intervals plus the running
/// one, if any.
#[derive(Debug, Default, Clone)]
pub struct Stopwatch {
    accumulated: Duration,
    started: Option<FastInstant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or resume) timing; no-op while already running
    #[inline(always)]
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(FastInstant::now());
        }
    }

    /// Stop timing and fold the running interval into the total
    #[inline(always)]
    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => self.accumulated + started.elapsed(),
            None => self.accumulated,
        }
    }
}
