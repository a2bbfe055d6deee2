//! Mock backend for testing
//!
//! Returns a canned [`RawResult`] after an optional delay, without touching any
//! device. While "working" it polls the cancellation signal and its own abort
//! flag every millisecond, which lets tests stand in for both backend kinds:
//! a cooperative one (direct) and one that only stops when aborted (process).
//!
//! # Example
//!
//! ```ignore
//! let backend = MockBackend::new(RawResult::success(vec![1.0], 1.0))
//!     .with_delay(Duration::from_secs(60))
//!     .ignoring_cancel();
//! ```

use super::{Backend, CancelSignal, RawResult};
use crate::config::MeasurementConfig;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Canned-result backend
#[derive(Debug)]
pub struct MockBackend {
    result: RawResult,
    delay: Duration,
    /// Keep working after cancel until `abort` is called
    ignore_cancel: bool,
    panic: bool,
    aborted: AtomicBool,
    measure_calls: AtomicUsize,
    abort_calls: AtomicUsize,
}

impl MockBackend {
    /// Backend that immediately returns `result`
    pub fn new(result: RawResult) -> Self {
        Self {
            result,
            delay: Duration::ZERO,
            ignore_cancel: false,
            panic: false,
            aborted: AtomicBool::new(false),
            measure_calls: AtomicUsize::new(0),
            abort_calls: AtomicUsize::new(0),
        }
    }

    /// Simulate `delay` of work before returning
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Only stop early on `abort`, like an external process would
    pub fn ignoring_cancel(mut self) -> Self {
        self.ignore_cancel = true;
        self
    }

    /// Panic instead of returning
    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn measure_calls(&self) -> usize {
        self.measure_calls.load(Ordering::SeqCst)
    }

    pub fn abort_calls(&self) -> usize {
        self.abort_calls.load(Ordering::SeqCst)
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn measure(&self, _config: &MeasurementConfig, cancel: &CancelSignal) -> RawResult {
        self.measure_calls.fetch_add(1, Ordering::SeqCst);

        let deadline = Instant::now() + self.delay;
        while Instant::now() < deadline {
            if self.aborted.load(Ordering::SeqCst) {
                return RawResult::canceled();
            }
            if !self.ignore_cancel && cancel.is_canceled() {
                return RawResult::canceled();
            }
            thread::sleep(POLL_INTERVAL);
        }

        if self.panic {
            panic!("mock backend panicked");
        }
        self.result.clone()
    }

    fn abort(&self) {
        self.abort_calls.fetch_add(1, Ordering::SeqCst);
        self.aborted.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Status;

    #[test]
    fn test_returns_canned_result() {
        let canned = RawResult::success(vec![10.0, 20.0], 15.0);
        let backend = MockBackend::new(canned.clone());

        let result = backend.measure(&MeasurementConfig::new(0), &CancelSignal::new());

        assert_eq!(result, canned);
        assert_eq!(backend.measure_calls(), 1);
        assert_eq!(backend.abort_calls(), 0);
    }

    #[test]
    fn test_cooperative_cancel() {
        let backend = MockBackend::new(RawResult::success(vec![1.0], 1.0))
            .with_delay(Duration::from_secs(60));
        let cancel = CancelSignal::new();
        cancel.cancel();

        let result = backend.measure(&MeasurementConfig::new(0), &cancel);
        assert_eq!(result.status(), Status::Canceled);
    }

    #[test]
    fn test_ignoring_cancel_runs_to_completion() {
        let backend = MockBackend::new(RawResult::failure("boom"))
            .with_delay(Duration::from_millis(20))
            .ignoring_cancel();
        let cancel = CancelSignal::new();
        cancel.cancel();

        let result = backend.measure(&MeasurementConfig::new(0), &cancel);
        assert_eq!(result.message(), Some("boom"));
    }
}
