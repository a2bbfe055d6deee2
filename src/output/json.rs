//! JSON output formatting
//!
//! One report object per run: the configuration that was measured, the backend
//! that measured it, the raw result, and a summary of the samples.

use crate::config::{BackendKind, MeasurementConfig};
use crate::engine::RawResult;
use crate::stats::SampleSummary;
use crate::Result;
use anyhow::Context;
use serde::Serialize;

/// Complete JSON report for one measurement
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub version: &'static str,
    pub backend: BackendKind,
    pub config: &'a MeasurementConfig,
    pub result: &'a RawResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SampleSummary>,
}

impl<'a> JsonReport<'a> {
    pub fn new(backend: BackendKind, config: &'a MeasurementConfig, result: &'a RawResult) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            backend,
            config,
            result,
            summary: SampleSummary::from_samples(result.samples()),
        }
    }
}

/// Render a report as pretty-printed JSON
pub fn render_report(report: &JsonReport<'_>) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize JSON report")
}
