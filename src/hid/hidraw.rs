//! Non-blocking `/dev/hidrawN` access on the tokio reactor.

use super::{HidOpener, RawHid};
use crate::error::Result;
use async_trait::async_trait;
use nix::libc;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::debug;

/// An open hidraw node.
///
/// Each `read` returns exactly one HID report; the kernel never splits or
/// merges reports on hidraw.
pub struct HidrawDevice {
    fd: AsyncFd<File>,
    path: PathBuf,
}

impl std::fmt::Debug for HidrawDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidrawDevice")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl HidrawDevice {
    /// Opens `path` read-write and registers it with the tokio reactor.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the node cannot be opened (missing, or no
    /// permission) or registered.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        let fd = AsyncFd::with_interest(file, Interest::READABLE | Interest::WRITABLE)?;
        debug!("Opened {}", path.display());
        Ok(Self {
            fd,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RawHid for HidrawDevice {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;
            match guard.try_io(|inner| inner.get_ref().read(buf)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.writable().await?;
            match guard.try_io(|inner| inner.get_ref().write(data)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

/// [`HidOpener`] for real hidraw nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct HidrawOpener;

impl HidOpener for HidrawOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn RawHid>> {
        Ok(Box::new(HidrawDevice::open(path)?))
    }
}
