//! Raw block device target
//!
//! Opens a device read-only for the duration of one measurement:
//!
//! - O_DIRECT when requested, so reads bypass the page cache
//! - `posix_fadvise(SEQUENTIAL)` as a read-ahead hint
//! - `flock(LOCK_EX | LOCK_NB)` so two measurements never share a device
//!
//! The handle (and with it the lock) is released when the target is dropped,
//! which covers every exit path of the measurement loop.
//!
//! Regular files are accepted too; their size comes from metadata instead of
//! the BLKGETSIZE64 ioctl.

use super::{OpenFlags, Target};
use crate::error::MeasureError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ioctl request code for getting block device size
const BLKGETSIZE64: libc::c_ulong = 0x80081272;

/// An open, locked device
#[derive(Debug)]
pub struct BlockTarget {
    path: PathBuf,
    file: File,
    size: u64,
}

impl BlockTarget {
    /// Open `path` with the given flags
    ///
    /// Failure to open is [`MeasureError::DeviceAccess`]; losing the lock race is
    /// [`MeasureError::DeviceBusy`]. A rejected fadvise hint is only logged.
    pub fn open(path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self, MeasureError> {
        let path = path.as_ref().to_path_buf();

        let mut options = OpenOptions::new();
        options.read(true);
        if flags.direct {
            options.custom_flags(libc::O_DIRECT);
        }

        let file = options.open(&path).map_err(|source| MeasureError::DeviceAccess {
            path: path.clone(),
            source,
        })?;
        let fd = file.as_raw_fd();

        if flags.exclusive {
            // SAFETY: fd is a valid open descriptor owned by `file`
            let rc = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
            if rc != 0 {
                let source = io::Error::last_os_error();
                return Err(if source.raw_os_error() == Some(libc::EWOULDBLOCK) {
                    MeasureError::DeviceBusy { path, source }
                } else {
                    MeasureError::DeviceAccess { path, source }
                });
            }
        }

        if flags.sequential {
            // SAFETY: fd is valid; posix_fadvise does not touch memory
            let rc = unsafe { libc::posix_fadvise(fd, 0, 0, libc::POSIX_FADV_SEQUENTIAL) };
            if rc != 0 {
                warn!(
                    path = %path.display(),
                    error = %io::Error::from_raw_os_error(rc),
                    "posix_fadvise(SEQUENTIAL) rejected"
                );
            }
        }

        let size = Self::detect_size(&file, &path)?;
        debug!(path = %path.display(), size, direct = flags.direct, "Opened device");

        Ok(Self { path, file, size })
    }

    fn detect_size(file: &File, path: &Path) -> Result<u64, MeasureError> {
        let metadata = file.metadata().map_err(|source| MeasureError::DeviceAccess {
            path: path.to_path_buf(),
            source,
        })?;

        if !metadata.file_type().is_block_device() {
            return Ok(metadata.len());
        }

        let mut size: u64 = 0;
        // SAFETY: BLKGETSIZE64 writes a single u64 through the pointer
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64, &mut size) };
        if rc != 0 {
            return Err(MeasureError::DeviceAccess {
                path: path.to_path_buf(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(size)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Device size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Target for BlockTarget {
    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}
