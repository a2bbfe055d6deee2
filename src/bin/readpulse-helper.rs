//! readpulse helper
//!
//! Runs one direct measurement and prints the outcome text on stdout. Meant to be
//! launched (usually through `sudo -n`) by the process backend, which passes the
//! measurement as positional arguments:
//!
//! ```text
//! readpulse-helper <device> <block_kib> <offset_kib> <area_mib> <location_mib> [<inner> <outer>]
//! ```
//!
//! On failure the error is printed as the last line of stdout and the exit code
//! is 1. Diagnostics go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use readpulse::config::validator::validate_measurement;
use readpulse::config::MeasurementConfig;
use readpulse::engine::direct::DirectBackend;
use readpulse::engine::{Backend, CancelSignal, Status};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "readpulse-helper", version, about = "Privileged readpulse measurement helper")]
struct HelperArgs {
    /// Physical device index (0 = sda)
    device: u32,

    /// Block size in KiB
    block_kib: u64,

    /// Block offset in KiB
    offset_kib: u64,

    /// Area size in MiB
    area_mib: u64,

    /// Area location in MiB
    location_mib: u64,

    /// Blocks read per sparse step
    #[arg(requires = "outer")]
    inner: Option<u32>,

    /// Sparse step length in blocks
    outer: Option<u32>,

    #[arg(long, env = "READPULSE_DEVICE_ROOT", default_value = "/dev", hide = true)]
    device_root: PathBuf,

    #[arg(long, hide = true)]
    buffered: bool,
}

impl HelperArgs {
    fn measurement(&self) -> MeasurementConfig {
        MeasurementConfig {
            device_index: self.device,
            block_size_kib: self.block_kib,
            block_offset_units: self.offset_kib,
            block_offset_multiple: 1,
            area_size_mib: self.area_mib,
            area_location_mib: self.location_mib,
            area_ratio_inner: self.inner.unwrap_or(0),
            area_ratio_outer: self.outer.unwrap_or(0),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            println!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = HelperArgs::parse();
    let config = args.measurement();
    validate_measurement(&config).context("Invalid measurement arguments")?;

    let mut backend = DirectBackend::new(&args.device_root);
    if args.buffered {
        backend = backend.buffered();
    }

    let result = backend.measure(&config, &CancelSignal::new());
    match result.status() {
        Status::Success => println!("{}", result.outcome_text().unwrap_or_default()),
        Status::Canceled => {}
        Status::Failure | Status::NotRun => {
            println!("{}", result.message().unwrap_or("Measurement failed"))
        }
    }

    Ok(ExitCode::from(result.status().exit_code()))
}
