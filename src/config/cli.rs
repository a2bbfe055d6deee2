//! CLI argument parsing using clap

use super::{BackendKind, DirectOptions, MeasurementConfig, ProcessOptions, RunConfig};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Measurement backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Read the device in-process
    Direct,
    /// Run the privileged helper executable
    Process,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Direct => BackendKind::Direct,
            BackendArg::Process => BackendKind::Process,
        }
    }
}

/// readpulse - sequential read throughput of raw block devices
#[derive(Parser, Debug)]
#[command(name = "readpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (CLI flags override its values)
    #[arg(short = 'c', long, env = "READPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Physical device index (0 = sda)
    #[arg(short = 'd', long)]
    pub device: Option<u32>,

    /// Measurement backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    // === Sampling Options ===
    /// Block size in KiB
    #[arg(short = 'b', long = "block-kib")]
    pub block_size_kib: Option<u64>,

    /// Extra offset in units of --offset-multiple KiB
    #[arg(long = "offset-units")]
    pub block_offset_units: Option<u64>,

    /// KiB per offset unit
    #[arg(long = "offset-multiple")]
    pub block_offset_multiple: Option<u64>,

    /// Size of the sampled area in MiB
    #[arg(short = 'a', long = "area-mib")]
    pub area_size_mib: Option<u64>,

    /// Start of the sampled area in MiB
    #[arg(short = 'l', long = "location-mib")]
    pub area_location_mib: Option<u64>,

    /// Consecutive blocks per sparse step
    #[arg(long = "ratio-inner")]
    pub area_ratio_inner: Option<u32>,

    /// Sparse step length in blocks (sparse mode when inner < outer)
    #[arg(long = "ratio-outer")]
    pub area_ratio_outer: Option<u32>,

    // === Direct Backend Options ===
    /// Directory holding device nodes
    #[arg(long)]
    pub device_root: Option<PathBuf>,

    /// Read through the page cache instead of O_DIRECT
    #[arg(long)]
    pub buffered: bool,

    // === Process Backend Options ===
    /// Helper executable path
    #[arg(long)]
    pub helper: Option<PathBuf>,

    /// Launch the helper without the elevation command
    #[arg(long)]
    pub no_elevate: bool,

    // === Output Options ===
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Validate and print the configuration without measuring
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the run configuration from the config file (if any) and flags
    pub fn build_config(&self) -> Result<RunConfig> {
        let base = match self.config {
            Some(ref path) => super::toml::parse_toml_file(path)?,
            None => RunConfig {
                measurement: MeasurementConfig::new(0),
                backend: BackendKind::default(),
                direct: DirectOptions::default(),
                process: ProcessOptions::default(),
            },
        };

        Ok(super::toml::merge_cli_with_config(self, base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let cli = Cli::parse_from(["readpulse"]);
        let config = cli.build_config().unwrap();

        assert_eq!(config.measurement, MeasurementConfig::new(0));
        assert_eq!(config.backend, BackendKind::Direct);
        assert!(!cli.json);
    }

    #[test]
    fn test_flags_override() {
        let cli = Cli::parse_from([
            "readpulse",
            "-d",
            "2",
            "--backend",
            "process",
            "-b",
            "64",
            "-a",
            "512",
            "--ratio-inner",
            "1",
            "--ratio-outer",
            "8",
            "--helper",
            "/usr/local/bin/readpulse-helper",
            "--no-elevate",
            "--buffered",
        ]);
        let config = cli.build_config().unwrap();

        assert_eq!(config.measurement.device_index, 2);
        assert_eq!(config.measurement.block_size_kib, 64);
        assert_eq!(config.measurement.area_size_mib, 512);
        assert!(config.measurement.is_sparse());
        assert_eq!(config.backend, BackendKind::Process);
        assert_eq!(
            config.process.helper_path,
            Some(PathBuf::from("/usr/local/bin/readpulse-helper"))
        );
        assert!(!config.process.elevate);
        assert!(!config.direct.direct_io);
    }

    #[test]
    fn test_rejects_negative_device() {
        assert!(Cli::try_parse_from(["readpulse", "-d", "-1"]).is_err());
    }
}
