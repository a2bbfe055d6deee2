//! Lap times and throughput scores
//!
//! A measurement run records one cumulative elapsed duration per block boundary.
//! Element 0 of the series is always zero ("before the first read"), so a run of N
//! reads produces N + 1 laps and N per-block scores.
//!
//! # Scoring
//!
//! Every score is `floor(bytes / seconds) / 1_000_000`: the byte rate is truncated
//! to a whole number of bytes per second before scaling to MB/s. Results recorded
//! by earlier versions depend on this order, so it must not become rounding.
//!
//! ```
//! use readpulse::stats::LapTimes;
//! use std::time::Duration;
//!
//! let laps = LapTimes::from_cumulative(vec![
//!     Duration::ZERO,
//!     Duration::from_millis(10),
//!     Duration::from_millis(20),
//! ]).unwrap();
//!
//! let samples = laps.samples(1024 * 1024);
//! assert_eq!(samples, vec![104.8576, 104.8576]);
//! assert_eq!(laps.total_score(1024 * 1024), 104.8576);
//! ```

use serde::Serialize;
use std::time::Duration;

/// Throughput in MB/s (10^6 bytes per second), floor-then-divide
///
/// The byte rate is computed exactly from the nanosecond duration. A zero duration
/// is treated as one nanosecond.
pub fn score_mb_per_sec(bytes: u64, elapsed: Duration) -> f64 {
    let nanos = elapsed.as_nanos().max(1);
    let bytes_per_sec = (bytes as u128 * 1_000_000_000) / nanos;
    bytes_per_sec as f64 / 1_000_000.0
}

/// Largest number of laps reserved before a run starts
pub const MAX_RESERVED_LAPS: usize = 1 << 20;

/// Cumulative elapsed read time at each block boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LapTimes {
    laps: Vec<Duration>,
}

impl LapTimes {
    /// Empty series (just the zero sentinel) sized for `reads` reads
    ///
    /// The up-front reservation is capped at [`MAX_RESERVED_LAPS`]; longer runs
    /// grow the series as they go.
    pub fn with_capacity(reads: usize) -> Self {
        let mut laps = Vec::with_capacity(reads.min(MAX_RESERVED_LAPS) + 1);
        laps.push(Duration::ZERO);
        Self { laps }
    }

    /// Build from a recorded series
    ///
    /// Returns `None` unless the series starts at zero and never decreases.
    pub fn from_cumulative(laps: Vec<Duration>) -> Option<Self> {
        if laps.first() != Some(&Duration::ZERO) {
            return None;
        }
        if laps.windows(2).any(|w| w[1] < w[0]) {
            return None;
        }
        Some(Self { laps })
    }

    /// Append the cumulative elapsed time after one more read
    #[inline]
    pub fn record(&mut self, cumulative: Duration) {
        self.laps.push(cumulative);
    }

    /// Number of reads recorded
    pub fn reads(&self) -> usize {
        self.laps.len() - 1
    }

    pub fn as_slice(&self) -> &[Duration] {
        &self.laps
    }

    /// Duration of each individual read
    pub fn intervals(&self) -> impl Iterator<Item = Duration> + '_ {
        self.laps.windows(2).map(|w| w[1].saturating_sub(w[0]))
    }

    /// Elapsed time between the first and last lap
    pub fn total(&self) -> Duration {
        match (self.laps.first(), self.laps.last()) {
            (Some(first), Some(last)) => last.saturating_sub(*first),
            _ => Duration::ZERO,
        }
    }

    /// Per-block scores in MB/s
    pub fn samples(&self, block_size_bytes: u64) -> Vec<f64> {
        self.intervals()
            .map(|interval| score_mb_per_sec(block_size_bytes, interval))
            .collect()
    }

    /// Aggregate score over all reads in MB/s
    pub fn total_score(&self, block_size_bytes: u64) -> f64 {
        let total_bytes = block_size_bytes.saturating_mul(self.reads() as u64);
        score_mb_per_sec(total_bytes, self.total())
    }
}

/// Summary of a sample series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SampleSummary {
    /// Summarize `samples`; `None` for an empty series
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;

        Some(Self {
            count: samples.len(),
            min,
            max,
            mean,
        })
    }
}
