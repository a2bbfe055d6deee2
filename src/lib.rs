//! readpulse - sequential read throughput measurement for raw block devices
//!
//! readpulse reads a configurable region of a disk block by block, times every
//! read against a monotonic clock, and reports per-block and aggregate
//! throughput in MB/s.
//!
//! # Architecture
//!
//! - **Backends**: in-process raw device reads, or an elevated helper process
//!   that runs the same reads and reports them as text
//! - **Cancellation**: cooperative between reads, or by terminating the helper
//! - **Async shim**: runs either backend off the caller's scheduler and races it
//!   against cancellation
//! - **Outcome text**: a small line-oriented format shared by the helper and the
//!   process backend

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod stats;
pub mod target;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::{MeasurementConfig, RunConfig};
pub use engine::{Backend, CancelSignal, RawResult, Status};
pub use error::MeasureError;
pub use worker::measure_async;

/// Result type used throughout readpulse
pub type Result<T> = anyhow::Result<T>;
