//! Read targets
//!
//! A target is the thing the direct backend reads from: in production a raw
//! block device, in tests a plain file or a scripted fake. The measurement loop
//! only needs to reposition and to read one full block at a time, so that is all
//! the [`Target`] trait exposes.

pub mod block;

use std::io;

/// Something the measurement loop can position and read sequentially
pub trait Target: Send {
    /// Move the read cursor to an absolute byte offset
    fn seek(&mut self, offset: u64) -> io::Result<()>;

    /// Fill `buf` from the current cursor and advance it
    ///
    /// Returns the number of bytes read. Anything less than `buf.len()` means the
    /// end of the target was reached.
    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// How a target is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Bypass the page cache (O_DIRECT)
    pub direct: bool,
    /// Advise the kernel of sequential access
    pub sequential: bool,
    /// Hold an exclusive non-blocking lock for the lifetime of the handle
    pub exclusive: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            direct: true,
            sequential: true,
            exclusive: true,
        }
    }
}

/// Linux disk name for a zero-based device index
///
/// Uses the kernel's bijective base-26 scheme: `0 -> sda`, `25 -> sdz`,
/// `26 -> sdaa`.
pub fn device_name(index: u32) -> String {
    let mut n = index as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();

    let mut name = String::with_capacity(2 + letters.len());
    name.push_str("sd");
    name.extend(letters.into_iter().map(char::from));
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_name() {
        assert_eq!(device_name(0), "sda");
        assert_eq!(device_name(1), "sdb");
        assert_eq!(device_name(25), "sdz");
        assert_eq!(device_name(26), "sdaa");
        assert_eq!(device_name(27), "sdab");
        assert_eq!(device_name(51), "sdaz");
        assert_eq!(device_name(52), "sdba");
        assert_eq!(device_name(701), "sdzz");
        assert_eq!(device_name(702), "sdaaa");
    }

    #[test]
    fn test_default_flags() {
        let flags = OpenFlags::default();
        assert!(flags.direct && flags.sequential && flags.exclusive);
    }
}
