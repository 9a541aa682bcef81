//! # Controller State
//!
//! Decoded snapshot of a Pro Controller 2: twenty digital buttons and two
//! analog sticks normalized to -1.0..1.0.
//!
//! A new [`ControllerState`] is produced for every report; it is never
//! mutated after decoding.

/// Normalized stick positions (-1.0 to 1.0, 0.0 = center).
///
/// Y axes follow the controller convention: positive is up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JoystickValues {
    /// Left stick X
    pub lx: f32,
    /// Left stick Y
    pub ly: f32,
    /// Right stick X
    pub rx: f32,
    /// Right stick Y
    pub ry: f32,
}

/// Complete controller input state.
///
/// # Examples
///
/// ```
/// use procon_bridge::controller::state::ControllerState;
///
/// let state = ControllerState::default();
/// assert!(!state.a);
/// assert_eq!(state.joysticks.lx, 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerState {
    // Face buttons
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,

    // Shoulder buttons
    pub l: bool,
    pub r: bool,
    pub zl: bool,
    pub zr: bool,

    // D-pad
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,

    // System buttons
    pub plus: bool,
    pub minus: bool,
    pub home: bool,
    pub capture: bool,

    // Stick presses
    pub left_stick_press: bool,
    pub right_stick_press: bool,

    // Rear paddles
    pub paddle_left: bool,
    pub paddle_right: bool,

    /// Normalized stick positions
    pub joysticks: JoystickValues,
}

impl ControllerState {
    /// All buttons as `(display name, pressed)` pairs in a fixed order.
    fn buttons(&self) -> [(&'static str, bool); 20] {
        [
            ("A", self.a),
            ("B", self.b),
            ("X", self.x),
            ("Y", self.y),
            ("L", self.l),
            ("R", self.r),
            ("ZL", self.zl),
            ("ZR", self.zr),
            ("UP", self.dpad_up),
            ("DOWN", self.dpad_down),
            ("LEFT", self.dpad_left),
            ("RIGHT", self.dpad_right),
            ("+", self.plus),
            ("-", self.minus),
            ("HOME", self.home),
            ("CAPTURE", self.capture),
            ("L-STICK", self.left_stick_press),
            ("R-STICK", self.right_stick_press),
            ("PADDLE-L", self.paddle_left),
            ("PADDLE-R", self.paddle_right),
        ]
    }

    /// Names of the currently pressed buttons.
    ///
    /// # Examples
    ///
    /// ```
    /// use procon_bridge::controller::state::ControllerState;
    ///
    /// let state = ControllerState { a: true, home: true, ..Default::default() };
    /// assert_eq!(state.pressed_buttons(), vec!["A", "HOME"]);
    /// ```
    #[must_use]
    pub fn pressed_buttons(&self) -> Vec<&'static str> {
        self.buttons()
            .iter()
            .filter(|(_, pressed)| *pressed)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Checks if any button is currently pressed.
    #[must_use]
    pub fn any_button_pressed(&self) -> bool {
        self.buttons().iter().any(|(_, pressed)| *pressed)
    }

    /// Compares button flags only, ignoring stick positions.
    #[must_use]
    pub fn buttons_equal(&self, other: &ControllerState) -> bool {
        self.buttons() == other.buttons()
    }

    /// Checks if any stick moved by more than `threshold` since `other`.
    ///
    /// `threshold` is in normalized units (0.0 to 2.0), the same unit the
    /// stick values are stored in.
    #[must_use]
    pub fn sticks_changed(&self, other: &ControllerState, threshold: f32) -> bool {
        let a = &self.joysticks;
        let b = &other.joysticks;
        (a.lx - b.lx).abs() > threshold
            || (a.ly - b.ly).abs() > threshold
            || (a.rx - b.rx).abs() > threshold
            || (a.ry - b.ry).abs() > threshold
    }
}

/// Coarse direction of a stick, for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickDirection {
    Center,
    Up,
    Down,
    Left,
    Right,
}

impl std::fmt::Display for StickDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StickDirection::Center => "CENTER",
            StickDirection::Up => "UP",
            StickDirection::Down => "DOWN",
            StickDirection::Left => "LEFT",
            StickDirection::Right => "RIGHT",
        };
        f.write_str(name)
    }
}

/// Classifies a normalized stick position.
///
/// Positions with both components inside `deadzone` are centered; otherwise
/// the dominant component wins. Positive Y is up.
#[must_use]
pub fn stick_direction(x: f32, y: f32, deadzone: f32) -> StickDirection {
    if x.abs() < deadzone && y.abs() < deadzone {
        return StickDirection::Center;
    }
    if x.abs() > y.abs() {
        if x > 0.0 {
            StickDirection::Right
        } else {
            StickDirection::Left
        }
    } else if y > 0.0 {
        StickDirection::Up
    } else {
        StickDirection::Down
    }
}
