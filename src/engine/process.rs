//! Process backend
//!
//! Delegates the measurement to the `readpulse-helper` executable, usually
//! through an elevation wrapper (`sudo -n` by default) because raw devices need
//! privileges the caller does not have. The helper runs the direct backend and
//! prints outcome text on stdout; this side parses it back into a [`RawResult`].
//!
//! Command line: `[elevation...] <helper> [--device-root DIR] [--buffered]
//! device block_kib offset_kib area_mib location_mib [inner outer]`.
//!
//! The running child is kept in a slot so that [`Backend::abort`] can signal it
//! from another thread. `measure` remains the only place that waits on it.
//!
//! stderr is drained on a side thread. It only matters when the child fails
//! without writing anything to stdout, which is how an elevation wrapper that
//! cannot elevate (`sudo: a password is required`) reports itself.

use super::{Backend, CancelSignal, RawResult};
use crate::config::{DirectOptions, MeasurementConfig, ProcessOptions};
use crate::error::MeasureError;
use crate::output::text;
use anyhow::Context;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// File name of the helper binary, expected next to the main executable
pub const HELPER_NAME: &str = "readpulse-helper";

/// Measures by launching the helper executable
#[derive(Debug)]
pub struct ProcessBackend {
    helper_path: PathBuf,
    elevation: Option<Vec<String>>,
    extra_args: Vec<String>,
    child: Mutex<Option<Child>>,
    spawns: AtomicUsize,
}

impl ProcessBackend {
    /// Backend running `helper_path` directly, without elevation
    pub fn new(helper_path: impl Into<PathBuf>) -> Self {
        Self {
            helper_path: helper_path.into(),
            elevation: None,
            extra_args: Vec::new(),
            child: Mutex::new(None),
            spawns: AtomicUsize::new(0),
        }
    }

    /// Prefix the helper with a whitespace-separated wrapper command
    ///
    /// An empty command disables elevation.
    pub fn with_elevation(mut self, command: &str) -> Self {
        let words: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        self.elevation = if words.is_empty() { None } else { Some(words) };
        self
    }

    /// Forward non-default direct backend options to the helper
    pub fn with_direct_options(mut self, options: &DirectOptions) -> Self {
        self.extra_args.clear();
        if options.device_root != DirectOptions::default().device_root {
            self.extra_args.push("--device-root".to_string());
            self.extra_args
                .push(options.device_root.to_string_lossy().into_owned());
        }
        if !options.direct_io {
            self.extra_args.push("--buffered".to_string());
        }
        self
    }

    /// Build from configuration
    ///
    /// Without an explicit helper path the helper is looked up next to the
    /// current executable. Elevation is skipped when already running as root.
    pub fn from_options(options: &ProcessOptions) -> anyhow::Result<Self> {
        let helper_path = match &options.helper_path {
            Some(path) => path.clone(),
            None => default_helper_path()?,
        };

        let backend = Self::new(helper_path);
        if options.elevate && !is_root() {
            Ok(backend.with_elevation(&options.elevation_command))
        } else {
            Ok(backend)
        }
    }

    pub fn helper_path(&self) -> &Path {
        &self.helper_path
    }

    pub fn is_elevated(&self) -> bool {
        self.elevation.is_some()
    }

    /// Number of helper processes started so far
    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    fn command(&self, config: &MeasurementConfig) -> Command {
        let mut command = match &self.elevation {
            Some(words) => {
                let mut command = Command::new(&words[0]);
                command.args(&words[1..]).arg(&self.helper_path);
                command
            }
            None => Command::new(&self.helper_path),
        };

        command
            .args(&self.extra_args)
            .args(config.helper_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    fn slot(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn launch_error(&self, source: io::Error) -> MeasureError {
        MeasureError::Launch {
            path: self.helper_path.clone(),
            source,
        }
    }

    fn run(
        &self,
        config: &MeasurementConfig,
        cancel: &CancelSignal,
    ) -> Result<RawResult, MeasureError> {
        if !self.helper_path.is_file() {
            return Err(MeasureError::HelperMissing(self.helper_path.clone()));
        }

        let mut child = self
            .command(config)
            .spawn()
            .map_err(|source| self.launch_error(source))?;
        self.spawns.fetch_add(1, Ordering::SeqCst);
        debug!(pid = child.id(), helper = %self.helper_path.display(), "Spawned helper");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take().and_then(drain_stderr);
        *self.slot() = Some(child);

        // Cancellation may have landed between the caller's check and the spawn
        if cancel.is_canceled() {
            self.abort();
        }

        let mut raw = Vec::new();
        let read = match stdout {
            Some(mut stdout) => stdout.read_to_end(&mut raw).map(|_| ()),
            None => Ok(()),
        };

        let waited = match self.slot().take() {
            Some(mut child) => child.wait(),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "helper process handle missing",
            )),
        };
        let errors = stderr
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        read.map_err(|source| self.launch_error(source))?;
        let status = waited.map_err(|source| self.launch_error(source))?;

        let output = String::from_utf8_lossy(&raw).into_owned();
        debug!(%status, bytes = raw.len(), stderr_bytes = errors.len(), "Helper exited");

        if status.success() {
            return RawResult::from_outcome_text(output).ok_or(MeasureError::MalformedOutput);
        }
        if cancel.is_canceled() {
            return Ok(RawResult::canceled());
        }

        let errors = String::from_utf8_lossy(&errors);
        let message = text::last_non_empty_line(&output)
            .or_else(|| text::last_non_empty_line(&errors))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Helper exited with {}", status));
        Err(MeasureError::HelperFailed(message))
    }
}

impl Backend for ProcessBackend {
    fn name(&self) -> &'static str {
        "process"
    }

    fn measure(&self, config: &MeasurementConfig, cancel: &CancelSignal) -> RawResult {
        if cancel.is_canceled() {
            return RawResult::canceled();
        }

        info!(
            helper = %self.helper_path.display(),
            elevated = self.is_elevated(),
            %config,
            "Starting helper measurement"
        );

        match self.run(config, cancel) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Helper measurement failed");
                RawResult::from_error(&e)
            }
        }
    }

    /// Signal the running helper, if any
    ///
    /// An elevated wrapper gets SIGTERM, which it relays to the helper; a direct
    /// child is killed outright. A child that already exited is not an error.
    fn abort(&self) {
        let mut slot = self.slot();
        let Some(child) = slot.as_mut() else {
            return;
        };

        let result = if self.is_elevated() {
            // SAFETY: kill has no memory effects; the pid is unreaped so it is still ours
            let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGTERM) };
            if rc == 0 {
                Ok(())
            } else {
                Err(io::Error::last_os_error())
            }
        } else {
            child.kill()
        };

        match result {
            Ok(()) => info!(pid = child.id(), "Terminated helper"),
            Err(e) => debug!(pid = child.id(), error = %e, "Helper already gone"),
        }
    }
}

/// Collect everything the child writes to stderr
fn drain_stderr(mut stderr: ChildStderr) -> Option<JoinHandle<Vec<u8>>> {
    let spawned = thread::Builder::new()
        .name("helper-stderr".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            buf
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to start stderr reader; helper diagnostics are lost");
            None
        }
    }
}

/// `readpulse-helper` in the directory of the running executable
pub fn default_helper_path() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate current executable")?;
    let dir = exe
        .parent()
        .context("Current executable has no parent directory")?;
    Ok(dir.join(HELPER_NAME))
}

fn is_root() -> bool {
    // SAFETY: geteuid cannot fail
    unsafe { libc::geteuid() == 0 }
}
