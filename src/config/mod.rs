//! Configuration module
//!
//! Holds the per-call measurement parameters, the sampling plan derived from them,
//! and the run-level settings (backend choice, helper location, device root) that
//! the CLI and TOML loader fill in.

pub mod cli;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Bytes per KiB
pub const KIB: u64 = 1024;

/// Bytes per MiB
pub const MIB: u64 = 1024 * 1024;

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub backend: BackendKind,
    pub measurement: MeasurementConfig,
    #[serde(default)]
    pub direct: DirectOptions,
    #[serde(default)]
    pub process: ProcessOptions,
}

/// Parameters of a single measurement call
///
/// Immutable once handed to a backend. All sizes are in the unit named by the
/// field suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Physical device index (0 = first disk)
    pub device_index: u32,
    /// Size of each timed read
    #[serde(default = "default_block_size_kib")]
    pub block_size_kib: u64,
    /// Extra offset, in units of `block_offset_multiple` KiB
    #[serde(default)]
    pub block_offset_units: u64,
    /// Stride of one offset unit in KiB (opaque caller constant)
    #[serde(default = "default_block_offset_multiple")]
    pub block_offset_multiple: u64,
    /// Size of the sampled region
    #[serde(default = "default_area_size_mib")]
    pub area_size_mib: u64,
    /// Start of the sampled region
    #[serde(default)]
    pub area_location_mib: u64,
    /// Consecutive blocks read per sparse step
    #[serde(default)]
    pub area_ratio_inner: u32,
    /// Sparse step length in blocks
    #[serde(default)]
    pub area_ratio_outer: u32,
}

fn default_block_size_kib() -> u64 {
    1024
}

fn default_block_offset_multiple() -> u64 {
    1
}

fn default_area_size_mib() -> u64 {
    1024
}

impl MeasurementConfig {
    /// Dense full-area configuration with default block and area sizes
    pub fn new(device_index: u32) -> Self {
        Self {
            device_index,
            block_size_kib: default_block_size_kib(),
            block_offset_units: 0,
            block_offset_multiple: default_block_offset_multiple(),
            area_size_mib: default_area_size_mib(),
            area_location_mib: 0,
            area_ratio_inner: 0,
            area_ratio_outer: 0,
        }
    }

    /// Sparse sampling is active only when inner < outer
    pub fn is_sparse(&self) -> bool {
        self.area_ratio_inner < self.area_ratio_outer
    }

    pub fn block_size_bytes(&self) -> u64 {
        self.block_size_kib.saturating_mul(KIB)
    }

    /// Extra offset in KiB (`units * multiple`)
    pub fn block_offset_kib(&self) -> u64 {
        self.block_offset_units
            .saturating_mul(self.block_offset_multiple)
    }

    /// Area size in KiB after reserving one block for a non-zero offset
    ///
    /// Shifting the region by a block offset would otherwise let the last read run
    /// past the configured area (and possibly past the end of the device).
    pub fn area_size_effective_kib(&self) -> u64 {
        let area_kib = self.area_size_mib.saturating_mul(KIB);
        if self.block_offset_kib() > 0 {
            area_kib.saturating_sub(self.block_size_kib)
        } else {
            area_kib
        }
    }

    /// Derive the read sequence for this configuration
    pub fn plan(&self) -> SamplingPlan {
        let area_kib = self.area_size_effective_kib();
        let start_offset = self
            .area_location_mib
            .saturating_mul(MIB)
            .saturating_add(self.block_offset_kib().saturating_mul(KIB));

        if self.is_sparse() {
            let step_kib = self
                .block_size_kib
                .saturating_mul(self.area_ratio_outer as u64);
            let outer_loops = area_kib.checked_div(step_kib).unwrap_or(0);
            let inner_loops = self.area_ratio_inner as u64;

            SamplingPlan {
                block_size_bytes: self.block_size_bytes(),
                outer_loops,
                inner_loops,
                start_offset,
                jump_bytes: step_kib.saturating_mul(KIB),
            }
        } else {
            SamplingPlan {
                block_size_bytes: self.block_size_bytes(),
                outer_loops: 1,
                inner_loops: area_kib.checked_div(self.block_size_kib).unwrap_or(0),
                start_offset,
                jump_bytes: 0,
            }
        }
    }

    /// Positional helper arguments
    ///
    /// `device block_kib offset_kib area_mib location_mib [inner outer]`; the ratio
    /// pair is only appended in sparse mode.
    pub fn helper_args(&self) -> Vec<String> {
        let mut args = vec![
            self.device_index.to_string(),
            self.block_size_kib.to_string(),
            self.block_offset_kib().to_string(),
            self.area_size_mib.to_string(),
            self.area_location_mib.to_string(),
        ];
        if self.is_sparse() {
            args.push(self.area_ratio_inner.to_string());
            args.push(self.area_ratio_outer.to_string());
        }
        args
    }
}

impl fmt::Display for MeasurementConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device={} block={}KiB offset={}KiB area={}MiB@{}MiB",
            self.device_index,
            self.block_size_kib,
            self.block_offset_kib(),
            self.area_size_mib,
            self.area_location_mib
        )?;
        if self.is_sparse() {
            write!(f, " ratio={}/{}", self.area_ratio_inner, self.area_ratio_outer)?;
        }
        Ok(())
    }
}

/// Read sequence derived from a [`MeasurementConfig`]
///
/// Dense mode is a single outer iteration covering every block of the area.
/// Sparse mode repositions before each outer iteration to
/// `start_offset + k * jump_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPlan {
    pub block_size_bytes: u64,
    pub outer_loops: u64,
    pub inner_loops: u64,
    pub start_offset: u64,
    pub jump_bytes: u64,
}

impl SamplingPlan {
    /// Total number of timed reads
    pub fn read_count(&self) -> u64 {
        self.outer_loops.saturating_mul(self.inner_loops)
    }

    /// Absolute byte offset of outer iteration `outer`
    pub fn offset_for(&self, outer: u64) -> u64 {
        self.start_offset
            .saturating_add(outer.saturating_mul(self.jump_bytes))
    }

    /// Byte offset just past the last planned read
    pub fn end_offset(&self) -> u64 {
        if self.read_count() == 0 {
            return self.start_offset;
        }
        self.offset_for(self.outer_loops - 1)
            .saturating_add(self.inner_loops.saturating_mul(self.block_size_bytes))
    }

    /// Bytes covered by all reads together
    pub fn total_bytes(&self) -> u64 {
        self.read_count().saturating_mul(self.block_size_bytes)
    }
}

/// Backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process raw device reads
    Direct,
    /// Delegate to the privileged helper executable
    Process,
}

impl Default for BackendKind {
    fn default() -> Self {
        Self::Direct
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Direct => write!(f, "direct"),
            BackendKind::Process => write!(f, "process"),
        }
    }
}

/// Direct backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectOptions {
    /// Directory holding the device nodes
    #[serde(default = "default_device_root")]
    pub device_root: PathBuf,
    /// Open with O_DIRECT (bypass the page cache)
    #[serde(default = "default_true")]
    pub direct_io: bool,
}

impl Default for DirectOptions {
    fn default() -> Self {
        Self {
            device_root: default_device_root(),
            direct_io: true,
        }
    }
}

fn default_device_root() -> PathBuf {
    PathBuf::from("/dev")
}

fn default_true() -> bool {
    true
}

/// Process backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Helper executable; defaults to `readpulse-helper` beside the current binary
    #[serde(default)]
    pub helper_path: Option<PathBuf>,
    /// Launch the helper through the elevation command unless already root
    #[serde(default = "default_true")]
    pub elevate: bool,
    /// Elevation program and its flags, split on whitespace (never run through a shell)
    #[serde(default = "default_elevation_command")]
    pub elevation_command: String,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            helper_path: None,
            elevate: true,
            elevation_command: default_elevation_command(),
        }
    }
}

fn default_elevation_command() -> String {
    "sudo -n".to_string()
}
