//! # Virtual Gamepad Module
//!
//! Re-emits decoded controller state through a kernel uinput device.
//!
//! This module handles:
//! - Describing the virtual gamepad (name, IDs, keys, axes)
//! - Mapping [`ControllerState`] to key and absolute-axis events
//! - Output-side stick deadzone and scaling to the 16-bit axis range
//! - Exclusive grab of the kernel's own input node for the controller
//!
//! ## Button Mapping
//!
//! | Controller | Event code |
//! |------------|------------|
//! | A / B / X / Y | `BTN_SOUTH` / `BTN_EAST` / `BTN_NORTH` / `BTN_WEST` |
//! | L / R / ZL / ZR | `BTN_TL` / `BTN_TR` / `BTN_TL2` / `BTN_TR2` |
//! | + / - / Home | `BTN_START` / `BTN_SELECT` / `BTN_MODE` |
//! | Stick presses | `BTN_THUMBL` / `BTN_THUMBR` |
//! | D-pad | `BTN_DPAD_*` |
//! | Capture | `BTN_TRIGGER_HAPPY1` |
//! | Left / right paddle | `BTN_TRIGGER_HAPPY2` / `BTN_TRIGGER_HAPPY3` |
//!
//! Sticks map to `ABS_X`/`ABS_Y` and `ABS_RX`/`ABS_RY` in -32768..32767 with
//! the Y axes inverted (evdev convention: positive is down).

mod evdev_backend;
pub mod sys;

pub use evdev_backend::EvdevInputSystem;

use crate::controller::state::ControllerState;
use crate::error::Result;
use crate::protocol::constants::{NINTENDO_VENDOR_ID, VIRTUAL_PRODUCT_ID, VIRTUAL_VERSION};
use evdev::{AbsoluteAxisType, EventType, InputEvent, Key};
use std::path::Path;
use tracing::{debug, warn};

/// Full-scale axis value
pub const AXIS_MAX: i32 = 32767;
/// Lowest axis value advertised to the kernel
pub const AXIS_MIN: i32 = -32768;
/// Kernel-side jitter filter
pub const AXIS_FUZZ: i32 = 16;
/// Kernel-side center deadzone
pub const AXIS_FLAT: i32 = 128;

/// Default output deadzone in normalized units
pub const DEFAULT_OUTPUT_DEADZONE: f32 = 0.05;

/// Keys registered on every virtual gamepad, in emission order.
pub const GAMEPAD_KEYS: [Key; 20] = [
    Key::BTN_SOUTH,
    Key::BTN_EAST,
    Key::BTN_NORTH,
    Key::BTN_WEST,
    Key::BTN_TL,
    Key::BTN_TR,
    Key::BTN_TL2,
    Key::BTN_TR2,
    Key::BTN_DPAD_UP,
    Key::BTN_DPAD_DOWN,
    Key::BTN_DPAD_LEFT,
    Key::BTN_DPAD_RIGHT,
    Key::BTN_START,
    Key::BTN_SELECT,
    Key::BTN_MODE,
    Key::BTN_THUMBL,
    Key::BTN_THUMBR,
    Key::BTN_TRIGGER_HAPPY1,
    Key::BTN_TRIGGER_HAPPY2,
    Key::BTN_TRIGGER_HAPPY3,
];

/// Absolute axes registered on every virtual gamepad, in emission order.
pub const GAMEPAD_AXES: [AbsoluteAxisType; 4] = [
    AbsoluteAxisType::ABS_X,
    AbsoluteAxisType::ABS_Y,
    AbsoluteAxisType::ABS_RX,
    AbsoluteAxisType::ABS_RY,
];

/// Identity and capabilities of a virtual gamepad.
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadSpec {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
    pub keys: Vec<Key>,
    pub axes: Vec<AbsoluteAxisType>,
}

impl GamepadSpec {
    /// Spec for player `player` (1-based): `"<base_name> (Player N)"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use procon_bridge::uinput::GamepadSpec;
    ///
    /// let spec = GamepadSpec::for_player("Nintendo Pro Controller 2", 2);
    /// assert_eq!(spec.name, "Nintendo Pro Controller 2 (Player 2)");
    /// assert_eq!(spec.product_id, 0x2019);
    /// ```
    pub fn for_player(base_name: &str, player: usize) -> Self {
        Self {
            name: format!("{} (Player {})", base_name, player),
            vendor_id: NINTENDO_VENDOR_ID,
            product_id: VIRTUAL_PRODUCT_ID,
            version: VIRTUAL_VERSION,
            keys: GAMEPAD_KEYS.to_vec(),
            axes: GAMEPAD_AXES.to_vec(),
        }
    }
}

/// OS virtual-input layer.
pub trait InputSystem: Send + Sync {
    /// Registers a new virtual gamepad with the kernel.
    fn create_gamepad(&self, spec: &GamepadSpec) -> Result<Box<dyn VirtualInput>>;

    /// Opens an input-event node and grabs it exclusively.
    fn grab(&self, path: &Path) -> Result<Box<dyn GrabbedNode>>;
}

/// A registered virtual input device.
pub trait VirtualInput: Send {
    /// Emits a batch of events followed by one `SYN_REPORT`.
    fn emit(&mut self, events: &[InputEvent]) -> Result<()>;

    /// Unregisters the device. Calling it again is a no-op.
    fn destroy(&mut self) -> Result<()>;
}

/// An exclusively grabbed input node.
///
/// Dropping the handle also releases the grab.
pub trait GrabbedNode: Send {
    /// Releases the grab. Calling it again is a no-op.
    fn release(&mut self) -> Result<()>;
}

/// Applies the output deadzone, clamps to -1.0..1.0 and scales to the axis range.
///
/// Values strictly inside `(-deadzone, deadzone)` become 0.
///
/// # Examples
///
/// ```
/// use procon_bridge::uinput::scale_axis;
///
/// assert_eq!(scale_axis(0.04, 0.05), 0);
/// assert_eq!(scale_axis(1.0, 0.05), 32767);
/// assert_eq!(scale_axis(-2.0, 0.05), -32767);
/// ```
#[must_use]
pub fn scale_axis(value: f32, deadzone: f32) -> i32 {
    if value.abs() < deadzone {
        return 0;
    }
    (value.clamp(-1.0, 1.0) * AXIS_MAX as f32) as i32
}

/// Key states in [`GAMEPAD_KEYS`] order.
fn key_states(state: &ControllerState) -> [bool; 20] {
    [
        state.a,
        state.b,
        state.x,
        state.y,
        state.l,
        state.r,
        state.zl,
        state.zr,
        state.dpad_up,
        state.dpad_down,
        state.dpad_left,
        state.dpad_right,
        state.plus,
        state.minus,
        state.home,
        state.left_stick_press,
        state.right_stick_press,
        state.capture,
        state.paddle_left,
        state.paddle_right,
    ]
}

/// Builds one frame of events: every key, then the four axes.
///
/// The terminating `SYN_REPORT` is added by [`VirtualInput::emit`].
#[must_use]
pub fn frame_events(state: &ControllerState, deadzone: f32) -> Vec<InputEvent> {
    let mut events = Vec::with_capacity(GAMEPAD_KEYS.len() + GAMEPAD_AXES.len());

    for (key, pressed) in GAMEPAD_KEYS.iter().zip(key_states(state)) {
        events.push(InputEvent::new(EventType::KEY, key.code(), i32::from(pressed)));
    }

    let sticks = &state.joysticks;
    let axis_values = [sticks.lx, -sticks.ly, sticks.rx, -sticks.ry];
    for (axis, value) in GAMEPAD_AXES.iter().zip(axis_values) {
        events.push(InputEvent::new(
            EventType::ABSOLUTE,
            axis.0,
            scale_axis(value, deadzone),
        ));
    }

    events
}

/// A virtual gamepad paired with one controller session.
///
/// The kernel device is destroyed on [`VirtualGamepad::destroy`] or drop,
/// whichever comes first.
pub struct VirtualGamepad {
    device: Box<dyn VirtualInput>,
    name: String,
    output_deadzone: f32,
    destroyed: bool,
}

impl std::fmt::Debug for VirtualGamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualGamepad")
            .field("name", &self.name)
            .field("output_deadzone", &self.output_deadzone)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl VirtualGamepad {
    /// Registers a virtual gamepad described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BridgeError::VirtualDevice`] if the kernel
    /// rejects the device (typically missing access to `/dev/uinput`).
    pub fn create(system: &dyn InputSystem, spec: &GamepadSpec, output_deadzone: f32) -> Result<Self> {
        let device = system.create_gamepad(spec)?;
        debug!("Created virtual gamepad \"{}\"", spec.name);
        Ok(Self {
            device,
            name: spec.name.clone(),
            output_deadzone,
            destroyed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Emits one full frame for `state`.
    pub fn update(&mut self, state: &ControllerState) -> Result<()> {
        let events = frame_events(state, self.output_deadzone);
        self.device.emit(&events)
    }

    /// Unregisters the kernel device. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Err(e) = self.device.destroy() {
            warn!("Failed to destroy virtual gamepad \"{}\": {}", self.name, e);
        } else {
            debug!("Destroyed virtual gamepad \"{}\"", self.name);
        }
    }
}

impl Drop for VirtualGamepad {
    fn drop(&mut self) {
        self.destroy();
    }
}
