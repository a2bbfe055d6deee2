//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate complete run configuration
pub fn validate_config(config: &RunConfig) -> Result<()> {
    validate_measurement(&config.measurement)?;

    if config.process.elevate && config.process.elevation_command.trim().is_empty() {
        anyhow::bail!("elevation_command must not be empty when elevate is enabled");
    }

    Ok(())
}

/// Validate measurement parameters
pub fn validate_measurement(config: &MeasurementConfig) -> Result<()> {
    if config.block_size_kib == 0 {
        anyhow::bail!("block_size_kib must be greater than 0");
    }

    if config.area_size_mib == 0 {
        anyhow::bail!("area_size_mib must be greater than 0");
    }

    if config.block_offset_units > 0 && config.block_offset_multiple == 0 {
        anyhow::bail!(
            "block_offset_multiple must be greater than 0 when block_offset_units is set ({})",
            config.block_offset_units
        );
    }

    if config.is_sparse() && config.area_ratio_inner == 0 {
        anyhow::bail!(
            "area_ratio_inner must be at least 1 for sparse sampling (outer = {})",
            config.area_ratio_outer
        );
    }

    // Offsets are byte positions on the device and must fit in off_t
    let max_offset = i64::MAX as u64;
    let plan = config.plan();
    if plan.end_offset() >= max_offset {
        anyhow::bail!("measurement area ends beyond the largest addressable offset");
    }

    if plan.read_count() == 0 {
        anyhow::bail!(
            "configuration yields no reads: area of {} KiB cannot hold a {} KiB block{}",
            config.area_size_effective_kib(),
            config.block_size_kib,
            if config.is_sparse() {
                format!(" step of ratio {}", config.area_ratio_outer)
            } else {
                String::new()
            }
        );
    }

    Ok(())
}
