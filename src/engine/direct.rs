//! Direct device backend
//!
//! Runs the read sequence of a [`SamplingPlan`] against a raw device in this
//! process. Each block read is bracketed by a [`Stopwatch`], so lap times contain
//! read time only; seeks and cancellation checks between reads are excluded.
//!
//! Cancellation is cooperative. The signal is checked before every read; a read
//! that is already in the kernel always runs to completion.

use super::{Backend, CancelSignal, RawResult};
use crate::config::validator::validate_measurement;
use crate::config::{DirectOptions, MeasurementConfig, SamplingPlan};
use crate::error::MeasureError;
use crate::stats::LapTimes;
use crate::target::block::BlockTarget;
use crate::target::{device_name, OpenFlags, Target};
use crate::util::buffer::{AlignedBuffer, DEFAULT_ALIGNMENT};
use crate::util::fast_time::Stopwatch;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How a read loop ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Every planned read finished
    Completed(LapTimes),
    /// The signal was observed before read number `completed_reads`
    Canceled { completed_reads: usize },
}

/// Execute `plan` against `target`, timing every block read
///
/// `buf` must be exactly one block long. The outer loop repositions to
/// [`SamplingPlan::offset_for`] before each run of `inner_loops` consecutive reads.
pub fn sample_reads<T: Target + ?Sized>(
    target: &mut T,
    plan: &SamplingPlan,
    buf: &mut [u8],
    cancel: &CancelSignal,
) -> Result<ReadOutcome, MeasureError> {
    let expected = buf.len();
    let mut laps = LapTimes::with_capacity(plan.read_count() as usize);
    let mut watch = Stopwatch::new();

    for outer in 0..plan.outer_loops {
        let offset = plan.offset_for(outer);
        target
            .seek(offset)
            .map_err(|source| MeasureError::Seek { offset, source })?;

        for inner in 0..plan.inner_loops {
            if cancel.is_canceled() {
                return Ok(ReadOutcome::Canceled {
                    completed_reads: laps.reads(),
                });
            }

            let block_offset = offset + inner * plan.block_size_bytes;

            watch.start();
            let result = target.read_block(buf);
            watch.stop();

            let got = result.map_err(|source| MeasureError::Read {
                offset: block_offset,
                length: expected,
                source,
            })?;
            if got < expected {
                return Err(MeasureError::ShortRead {
                    offset: block_offset,
                    got,
                    expected,
                });
            }

            laps.record(watch.elapsed());
        }
    }

    Ok(ReadOutcome::Completed(laps))
}

/// Reads `<device_root>/sdX` in-process
#[derive(Debug, Clone)]
pub struct DirectBackend {
    device_root: PathBuf,
    direct_io: bool,
}

impl DirectBackend {
    /// Backend reading devices under `device_root` with O_DIRECT
    pub fn new(device_root: impl Into<PathBuf>) -> Self {
        Self {
            device_root: device_root.into(),
            direct_io: true,
        }
    }

    pub fn from_options(options: &DirectOptions) -> Self {
        Self {
            device_root: options.device_root.clone(),
            direct_io: options.direct_io,
        }
    }

    /// Go through the page cache instead of O_DIRECT
    pub fn buffered(mut self) -> Self {
        self.direct_io = false;
        self
    }

    pub fn device_root(&self) -> &Path {
        &self.device_root
    }

    pub fn device_path(&self, device_index: u32) -> PathBuf {
        self.device_root.join(device_name(device_index))
    }

    fn run(
        &self,
        path: &Path,
        plan: &SamplingPlan,
        cancel: &CancelSignal,
    ) -> Result<ReadOutcome, MeasureError> {
        let flags = OpenFlags {
            direct: self.direct_io,
            ..OpenFlags::default()
        };
        let mut target = BlockTarget::open(path, flags)?;

        let end = plan.end_offset();
        if end > target.size() {
            return Err(MeasureError::OutOfBounds {
                path: path.to_path_buf(),
                end,
                size: target.size(),
            });
        }

        let size = usize::try_from(plan.block_size_bytes)
            .map_err(|_| MeasureError::Buffer { size: usize::MAX })?;
        let mut buffer =
            AlignedBuffer::new(size, DEFAULT_ALIGNMENT).ok_or(MeasureError::Buffer { size })?;
        debug_assert!(buffer.is_aligned());

        sample_reads(&mut target, plan, buffer.as_mut_slice(), cancel)
    }
}

impl Backend for DirectBackend {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn measure(&self, config: &MeasurementConfig, cancel: &CancelSignal) -> RawResult {
        if cancel.is_canceled() {
            return RawResult::canceled();
        }
        if let Err(e) = validate_measurement(config) {
            return RawResult::failure(format!("Invalid configuration: {:#}", e));
        }

        let plan = config.plan();
        let path = self.device_path(config.device_index);
        info!(
            device = %path.display(),
            reads = plan.read_count(),
            block_bytes = plan.block_size_bytes,
            sparse = config.is_sparse(),
            "Starting direct measurement"
        );

        match self.run(&path, &plan, cancel) {
            Ok(ReadOutcome::Completed(laps)) => {
                let block = plan.block_size_bytes;
                let result = RawResult::success(laps.samples(block), laps.total_score(block));
                info!(
                    device = %path.display(),
                    elapsed_ms = laps.total().as_millis() as u64,
                    total_mb_s = result.total_score().unwrap_or_default(),
                    "Measurement complete"
                );
                result
            }
            Ok(ReadOutcome::Canceled { completed_reads }) => {
                info!(device = %path.display(), completed_reads, "Measurement canceled");
                RawResult::canceled()
            }
            Err(e) => {
                warn!(device = %path.display(), error = %e, "Measurement failed");
                RawResult::from_error(&e)
            }
        }
    }
}
