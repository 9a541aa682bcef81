//! # Platform Collaborators
//!
//! Bundles the OS-facing implementations the bridge runs on. Production
//! code uses [`Platform::linux`]; tests assemble one from mocks.

use crate::error::Result;
use crate::hid::{HidOpener, HidrawOpener, PathResolver, SysfsResolver};
use crate::uinput::{EvdevInputSystem, InputSystem};
use crate::usb::{NusbBackend, UsbBackend};
use std::sync::Arc;

/// Shared handles to every external collaborator.
#[derive(Clone)]
pub struct Platform {
    pub usb: Arc<dyn UsbBackend>,
    pub resolver: Arc<dyn PathResolver>,
    pub hid: Arc<dyn HidOpener>,
    pub input: Arc<dyn InputSystem>,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

impl Platform {
    /// Linux implementations: usbfs, sysfs, hidraw and uinput.
    ///
    /// # Errors
    ///
    /// Fails if USB enumeration is unavailable on this system.
    pub fn linux() -> Result<Self> {
        Ok(Self {
            usb: Arc::new(NusbBackend::new()?),
            resolver: Arc::new(SysfsResolver::new()),
            hid: Arc::new(HidrawOpener),
            input: Arc::new(EvdevInputSystem),
        })
    }
}
