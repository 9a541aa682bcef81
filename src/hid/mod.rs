//! # Raw HID Module
//!
//! Locates and talks to the kernel's `/dev/hidrawN` node for a controller.
//!
//! This module handles:
//! - Mapping a USB (bus, address) pair to its hidraw and input-event nodes
//! - Opening hidraw nodes for non-blocking async I/O
//!
//! Input reports are read from hidraw rather than the USB IN endpoint: the
//! kernel HID driver stays bound to the HID interface while this process owns
//! the vendor interface.

mod hidraw;
mod sysfs;

pub use hidraw::{HidrawDevice, HidrawOpener};
pub use sysfs::SysfsResolver;

use crate::error::Result;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// Maps a USB device to its kernel device nodes.
#[cfg_attr(test, mockall::automock)]
pub trait PathResolver: Send + Sync {
    /// `/dev/hidrawN` for the device, if the kernel created one.
    fn hidraw_path(&self, bus: u8, address: u8) -> Option<PathBuf>;

    /// `/dev/input/eventN` the kernel created for the device, if any.
    fn event_path(&self, bus: u8, address: u8) -> Option<PathBuf>;
}

/// An open raw HID device.
#[async_trait]
pub trait RawHid: Send {
    /// Reads one input report. Returns the number of bytes read.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes one output report.
    async fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// Opens raw HID device nodes.
pub trait HidOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn RawHid>>;
}
