//! readpulse CLI entry point

use anyhow::{Context, Result};
use readpulse::config::cli::Cli;
use readpulse::config::validator::validate_config;
use readpulse::config::{BackendKind, RunConfig};
use readpulse::engine::direct::DirectBackend;
use readpulse::engine::process::ProcessBackend;
use readpulse::engine::{CancelSignal, RawResult, Status};
use readpulse::measure_async;
use readpulse::output::json::{render_report, JsonReport};
use readpulse::stats::SampleSummary;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();
    let config = cli.build_config()?;
    validate_config(&config).context("Configuration validation failed")?;

    if cli.dry_run {
        let rendered =
            toml::to_string_pretty(&config).context("Failed to render configuration")?;
        println!("{}", rendered);
        println!("# Dry run mode - configuration validated successfully");
        return Ok(ExitCode::SUCCESS);
    }

    info!(
        "readpulse v{} measuring {} via {} backend",
        env!("CARGO_PKG_VERSION"),
        config.measurement,
        config.backend
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;
    let result = runtime.block_on(run(&config));
    // Leave an uninterruptible read behind instead of waiting on it
    runtime.shutdown_timeout(Duration::from_secs(1));
    let result = result?;

    report(&cli, &config, &result)?;

    Ok(ExitCode::from(result.status().exit_code()))
}

/// Run the configured backend until it finishes or Ctrl-C cancels it
async fn run(config: &RunConfig) -> Result<RawResult> {
    let cancel = CancelSignal::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() && cancel.cancel() {
                warn!("Interrupt received, canceling measurement");
            }
        });
    }

    let measurement = config.measurement.clone();
    let result = match config.backend {
        BackendKind::Direct => {
            let backend = Arc::new(DirectBackend::from_options(&config.direct));
            measure_async(backend, measurement, cancel).await
        }
        BackendKind::Process => {
            let backend = ProcessBackend::from_options(&config.process)
                .context("Failed to set up process backend")?
                .with_direct_options(&config.direct);
            measure_async(Arc::new(backend), measurement, cancel).await
        }
    };

    Ok(result)
}

fn report(cli: &Cli, config: &RunConfig, result: &RawResult) -> Result<()> {
    if cli.json {
        let report = JsonReport::new(config.backend, &config.measurement, result);
        println!("{}", render_report(&report)?);
        return Ok(());
    }

    match result.status() {
        Status::Success => {
            println!("{}", result.outcome_text().unwrap_or_default());
            if let Some(summary) = SampleSummary::from_samples(result.samples()) {
                info!(
                    blocks = summary.count,
                    min = summary.min,
                    max = summary.max,
                    mean = summary.mean,
                    "Sample summary (MB/s)"
                );
            }
        }
        Status::Failure => {
            let message = result.message().unwrap_or("unknown error");
            error!(%message, "Measurement failed");
            eprintln!("Error: {}", message);
        }
        Status::Canceled => eprintln!("Measurement canceled"),
        Status::NotRun => eprintln!("Measurement did not run"),
    }

    Ok(())
}
