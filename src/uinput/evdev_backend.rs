//! uinput devices and exclusive grabs through the `evdev` crate.

use super::{sys, GamepadSpec, GrabbedNode, InputSystem, VirtualInput, AXIS_FLAT, AXIS_FUZZ, AXIS_MAX, AXIS_MIN};
use crate::error::{BridgeError, Result};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AttributeSet, BusType, Device, InputEvent, InputId, Key, UinputAbsSetup};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::debug;

/// [`InputSystem`] over `/dev/uinput` and evdev nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvdevInputSystem;

fn virtual_error(context: &str, e: std::io::Error) -> BridgeError {
    BridgeError::VirtualDevice(format!("{}: {}", context, e))
}

impl InputSystem for EvdevInputSystem {
    fn create_gamepad(&self, spec: &GamepadSpec) -> Result<Box<dyn VirtualInput>> {
        let mut keys = AttributeSet::<Key>::new();
        for key in &spec.keys {
            keys.insert(*key);
        }

        let stick = AbsInfo::new(0, AXIS_MIN, AXIS_MAX, AXIS_FUZZ, AXIS_FLAT, 0);

        let mut builder = VirtualDeviceBuilder::new()
            .map_err(|e| virtual_error("open /dev/uinput", e))?
            .name(&spec.name)
            .input_id(InputId::new(
                BusType::BUS_USB,
                spec.vendor_id,
                spec.product_id,
                spec.version,
            ))
            .with_keys(&keys)
            .map_err(|e| virtual_error("register keys", e))?;

        for axis in &spec.axes {
            builder = builder
                .with_absolute_axis(&UinputAbsSetup::new(*axis, stick))
                .map_err(|e| virtual_error("register axis", e))?;
        }

        let device = builder
            .build()
            .map_err(|e| virtual_error("create device", e))?;

        debug!("uinput device \"{}\" registered", spec.name);

        Ok(Box::new(EvdevGamepad {
            device,
            destroyed: false,
        }))
    }

    fn grab(&self, path: &Path) -> Result<Box<dyn GrabbedNode>> {
        let mut device = Device::open(path)
            .map_err(|e| BridgeError::Discovery(format!("open {}: {}", path.display(), e)))?;
        device
            .grab()
            .map_err(|e| BridgeError::Discovery(format!("grab {}: {}", path.display(), e)))?;

        debug!("Grabbed {}", path.display());

        Ok(Box::new(EvdevGrab {
            device,
            path: path.to_path_buf(),
            held: true,
        }))
    }
}

struct EvdevGamepad {
    device: VirtualDevice,
    destroyed: bool,
}

impl VirtualInput for EvdevGamepad {
    fn emit(&mut self, events: &[InputEvent]) -> Result<()> {
        if self.destroyed {
            return Err(BridgeError::VirtualDevice("device already destroyed".to_string()));
        }
        self.device
            .emit(events)
            .map_err(|e| virtual_error("emit", e))
    }

    fn destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        sys::destroy_device(self.device.as_raw_fd())
            .map_err(|e| BridgeError::VirtualDevice(format!("UI_DEV_DESTROY: {}", e)))
    }
}

struct EvdevGrab {
    device: Device,
    path: PathBuf,
    held: bool,
}

impl GrabbedNode for EvdevGrab {
    fn release(&mut self) -> Result<()> {
        if !self.held {
            return Ok(());
        }
        self.held = false;
        self.device
            .ungrab()
            .map_err(|e| BridgeError::Discovery(format!("ungrab {}: {}", self.path.display(), e)))?;
        debug!("Released {}", self.path.display());
        Ok(())
    }
}

impl Drop for EvdevGrab {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
