//! Measurement backends
//!
//! A backend takes a [`MeasurementConfig`] and a [`CancelSignal`] and returns a
//! populated [`RawResult`]. Two implementations exist:
//!
//! - **Direct**: opens the raw device in-process and times every block read
//! - **Process**: launches the (elevated) helper executable, which runs the direct
//!   backend itself, and parses its outcome text
//!
//! Backends are synchronous and may block for a long time. Callers on an async
//! runtime go through [`crate::worker::measure_async`], which moves the call onto a
//! blocking thread and races it against cancellation.
//!
//! # Example
//!
//! ```no_run
//! use readpulse::config::MeasurementConfig;
//! use readpulse::engine::direct::DirectBackend;
//! use readpulse::engine::{Backend, CancelSignal};
//!
//! let backend = DirectBackend::new("/dev");
//! let result = backend.measure(&MeasurementConfig::new(0), &CancelSignal::new());
//! if result.is_success() {
//!     println!("{}", result.outcome_text().unwrap_or_default());
//! }
//! ```

pub mod cancel;
pub mod direct;
pub mod process;

#[cfg(test)]
pub mod mock;

pub use cancel::CancelSignal;

use crate::config::MeasurementConfig;
use crate::error::MeasureError;
use crate::output::text;
use serde::Serialize;
use std::fmt;

/// Terminal state of a measurement call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
    Canceled,
    NotRun,
}

/// Process exit code for a run interrupted by the user (128 + SIGINT)
pub const EXIT_CANCELED: u8 = 130;

impl Status {
    /// Exit code a binary reports for a run that ended in this state
    pub fn exit_code(self) -> u8 {
        match self {
            Status::Success => 0,
            Status::Canceled => EXIT_CANCELED,
            Status::Failure | Status::NotRun => 1,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Canceled => "canceled",
            Status::NotRun => "not run",
        };
        f.write_str(s)
    }
}

/// Outcome of one measurement call
///
/// Built once by a backend (or by the async shim on cancellation) and handed to
/// the caller by value. Only `Success` carries samples, a total score and outcome
/// text; only `Failure` carries a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawResult {
    status: Status,
    samples: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl RawResult {
    pub fn not_run() -> Self {
        Self {
            status: Status::NotRun,
            samples: Vec::new(),
            total_score: None,
            outcome_text: None,
            message: None,
        }
    }

    /// Successful run; renders the canonical outcome text
    pub fn success(samples: Vec<f64>, total_score: f64) -> Self {
        let outcome_text = text::render_outcome(&samples, total_score);
        Self {
            status: Status::Success,
            samples,
            total_score: Some(total_score),
            outcome_text: Some(outcome_text),
            message: None,
        }
    }

    /// Rebuild a successful result from outcome text produced elsewhere
    ///
    /// The captured text is kept as-is. Returns `None` when the data block is
    /// missing, unparsable, or empty.
    pub fn from_outcome_text(outcome_text: String) -> Option<Self> {
        let samples = text::parse_samples(&outcome_text)?;
        if samples.is_empty() {
            return None;
        }
        let total_score = text::parse_total(&outcome_text);

        Some(Self {
            status: Status::Success,
            samples,
            total_score,
            outcome_text: Some(outcome_text),
            message: None,
        })
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            message: Some(message.into()),
            ..Self::not_run()
        }
    }

    pub fn from_error(err: &MeasureError) -> Self {
        Self::failure(err.to_string())
    }

    pub fn canceled() -> Self {
        Self {
            status: Status::Canceled,
            ..Self::not_run()
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Per-block throughput in MB/s, in read order
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn total_score(&self) -> Option<f64> {
        self.total_score
    }

    pub fn outcome_text(&self) -> Option<&str> {
        self.outcome_text.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Default for RawResult {
    fn default() -> Self {
        Self::not_run()
    }
}

/// A way of measuring a device
///
/// `measure` is blocking and returns exactly one terminal result. It must observe
/// `cancel` at its own safe points; it never panics on device or process errors.
///
/// `abort` is called from another thread when the caller gives up on a running
/// `measure`. Implementations use it to kill external work; the default does
/// nothing, which is right for backends that only poll `cancel`.
pub trait Backend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    fn measure(&self, config: &MeasurementConfig, cancel: &CancelSignal) -> RawResult;

    fn abort(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_not_run_is_empty() {
        let result = RawResult::default();
        assert_eq!(result.status(), Status::NotRun);
        assert!(result.samples().is_empty());
        assert!(result.outcome_text().is_none());
        assert!(result.message().is_none());
    }

    #[test]
    fn test_success_round_trips_through_text() {
        let samples = vec![104.8576, 99.999999, 0.0, 1234.5];
        let result = RawResult::success(samples.clone(), 350.1);

        let text = result.outcome_text().unwrap().to_string();
        let parsed = RawResult::from_outcome_text(text).unwrap();

        assert!(parsed.is_success());
        assert_eq!(parsed.samples(), samples.as_slice());
        assert_eq!(parsed.total_score(), Some(350.1));
    }

    #[test]
    fn test_from_outcome_text_keeps_captured_text() {
        let text = "probing sda\r\n[Start data]\r\n1.500000 2.500000\r\n[End data]\r\nTotal 2.000000 MB/s\r\n";
        let result = RawResult::from_outcome_text(text.to_string()).unwrap();
        assert_eq!(result.samples(), &[1.5, 2.5]);
        assert_eq!(result.outcome_text(), Some(text));
    }

    #[test]
    fn test_from_outcome_text_rejects_malformed() {
        assert!(RawResult::from_outcome_text("[Start data]\n1.0 2.0\n".to_string()).is_none());
        assert!(RawResult::from_outcome_text("[Start data]\n[End data]\n".to_string()).is_none());
        assert!(RawResult::from_outcome_text("[Start data]\n1.0 abc\n[End data]".to_string()).is_none());
    }

    #[test]
    fn test_failure_from_error() {
        let err = MeasureError::DeviceAccess {
            path: PathBuf::from("/dev/sdb"),
            source: io::Error::from_raw_os_error(13),
        };
        let result = RawResult::from_error(&err);

        assert_eq!(result.status(), Status::Failure);
        assert!(result.samples().is_empty());
        assert!(result.message().unwrap().contains("/dev/sdb"));
        assert!(result.message().unwrap().contains("os error 13"));
    }

    #[test]
    fn test_canceled_has_no_samples() {
        let result = RawResult::canceled();
        assert_eq!(result.status(), Status::Canceled);
        assert!(result.samples().is_empty());
        assert!(result.message().is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Status::Success.exit_code(), 0);
        assert_eq!(Status::Failure.exit_code(), 1);
        assert_eq!(Status::NotRun.exit_code(), 1);
        assert_eq!(Status::Canceled.exit_code(), EXIT_CANCELED);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(RawResult::canceled()).unwrap();
        assert_eq!(json["status"], "canceled");
        assert_eq!(json["samples"], serde_json::json!([]));
        assert_eq!(serde_json::to_value(Status::NotRun).unwrap(), "notrun");
    }
}
