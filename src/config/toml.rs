//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<RunConfig> {
    let config: RunConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: RunConfig) -> RunConfig {
    let m = &mut config.measurement;
    if let Some(device) = cli.device {
        m.device_index = device;
    }
    if let Some(block) = cli.block_size_kib {
        m.block_size_kib = block;
    }
    if let Some(units) = cli.block_offset_units {
        m.block_offset_units = units;
    }
    if let Some(multiple) = cli.block_offset_multiple {
        m.block_offset_multiple = multiple;
    }
    if let Some(area) = cli.area_size_mib {
        m.area_size_mib = area;
    }
    if let Some(location) = cli.area_location_mib {
        m.area_location_mib = location;
    }
    if let Some(inner) = cli.area_ratio_inner {
        m.area_ratio_inner = inner;
    }
    if let Some(outer) = cli.area_ratio_outer {
        m.area_ratio_outer = outer;
    }

    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }
    if let Some(ref root) = cli.device_root {
        config.direct.device_root = root.clone();
    }
    if cli.buffered {
        config.direct.direct_io = false;
    }
    if let Some(ref helper) = cli.helper {
        config.process.helper_path = Some(helper.clone());
    }
    if cli.no_elevate {
        config.process.elevate = false;
    }

    config
}
