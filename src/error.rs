//! Measurement error taxonomy
//!
//! Every failure a backend can hit maps onto one of these variants. Backends never
//! hand a `MeasureError` to their caller directly: it is rendered into the
//! `message` of a `Failure` [`RawResult`](crate::engine::RawResult). The variants
//! exist so that access problems (usually missing privileges) stay distinguishable
//! from I/O failures that happen in the middle of a run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while measuring a device
#[derive(Error, Debug)]
pub enum MeasureError {
    /// The device (or an elevated helper) could not be obtained
    #[error("Failed to open device {path}: {source}")]
    DeviceAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another measurement holds the device lock
    #[error("Device {path} is busy: {source}")]
    DeviceBusy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Positioning failed mid-measurement
    #[error("Seek to offset {offset} failed: {source}")]
    Seek {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// A block read failed mid-measurement
    #[error("Read of {length} bytes at offset {offset} failed: {source}")]
    Read {
        offset: u64,
        length: usize,
        #[source]
        source: io::Error,
    },

    /// A block read returned fewer bytes than requested
    #[error("Short read at offset {offset}: got {got} of {expected} bytes")]
    ShortRead {
        offset: u64,
        got: usize,
        expected: usize,
    },

    /// The planned reads extend past the end of the device
    #[error("Measurement area ends at byte {end} but {path} holds only {size} bytes")]
    OutOfBounds { path: PathBuf, end: u64, size: u64 },

    /// The read buffer could not be allocated
    #[error("Failed to allocate {size} byte read buffer")]
    Buffer { size: usize },

    /// The helper executable is not where it should be
    #[error("Helper executable not found: {0}")]
    HelperMissing(PathBuf),

    /// The helper could not be started or its output could not be read
    #[error("Failed to run helper {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The helper exited with an error and reported it on its last line
    #[error("{0}")]
    HelperFailed(String),

    /// The helper output carried no recognizable result block
    #[error("Helper produced no readable measurement data")]
    MalformedOutput,
}

impl MeasureError {
    /// Platform error code behind this failure, if one exists
    pub fn os_code(&self) -> Option<i32> {
        match self {
            MeasureError::DeviceAccess { source, .. }
            | MeasureError::DeviceBusy { source, .. }
            | MeasureError::Seek { source, .. }
            | MeasureError::Read { source, .. }
            | MeasureError::Launch { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// True for failures caused by missing privileges or an unavailable device
    pub fn is_access_failure(&self) -> bool {
        matches!(
            self,
            MeasureError::DeviceAccess { .. } | MeasureError::DeviceBusy { .. }
        )
    }
}
