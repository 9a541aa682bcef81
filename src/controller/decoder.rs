//! # Input Report Decoder
//!
//! Turns a raw HID input report into a [`ControllerState`].
//!
//! ## Button Bytes
//!
//! | Offset | 0x01 | 0x02 | 0x04 | 0x08 | 0x10 | 0x20 | 0x40 | 0x80 |
//! |--------|------|------|------|------|------|------|------|------|
//! | 3 | B | A | Y | X | R | ZR | + | R-stick |
//! | 4 | Down | Right | Left | Up | L | ZL | - | L-stick |
//! | 5 | Home | Capture | Paddle R | Paddle L | | | | |
//!
//! ## Stick Groups
//!
//! Reports with ID 0x30 or 0x09 carry two 3-byte stick groups (left at offset
//! 6, right at offset 9), each packing two 12-bit values:
//!
//! ```text
//! byte0 = X[7:0]
//! byte1 = Y[3:0] << 4 | X[11:8]
//! byte2 = Y[11:4]
//! ```
//!
//! Decoding never fails: missing bytes leave buttons released, and a stick
//! without data stays centered.

use super::calibration::{normalize_axis, CalibrationProfile};
use super::report::RawReport;
use super::state::{ControllerState, JoystickValues};
use crate::protocol::constants::{
    BUTTONS_LEFT_OFFSET, BUTTONS_RIGHT_OFFSET, BUTTONS_SYSTEM_OFFSET, LEFT_STICK_OFFSET,
    REPORT_ID_FULL, REPORT_ID_SIMPLE, RIGHT_STICK_OFFSET, STICK_RAW_MAX,
};

/// Which analog stick to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stick {
    Left,
    Right,
}

impl Stick {
    fn offset(self) -> usize {
        match self {
            Stick::Left => LEFT_STICK_OFFSET,
            Stick::Right => RIGHT_STICK_OFFSET,
        }
    }
}

/// Decodes a report into a controller state.
///
/// Pure and deterministic: identical bytes and calibration always yield an
/// identical state.
///
/// # Examples
///
/// ```
/// use procon_bridge::controller::calibration::DEFAULT_CALIBRATION;
/// use procon_bridge::controller::decoder::decode;
/// use procon_bridge::controller::report::RawReport;
///
/// let report = RawReport::from_bytes(&[0x30, 0x00, 0x00, 0x02]);
/// let state = decode(&report, &DEFAULT_CALIBRATION);
/// assert!(state.a);
/// assert!(!state.b);
/// ```
#[must_use]
pub fn decode(report: &RawReport, calibration: &CalibrationProfile) -> ControllerState {
    let mut state = ControllerState::default();

    if let Some(b3) = report.get(BUTTONS_RIGHT_OFFSET) {
        state.b = b3 & 0x01 != 0;
        state.a = b3 & 0x02 != 0;
        state.y = b3 & 0x04 != 0;
        state.x = b3 & 0x08 != 0;
        state.r = b3 & 0x10 != 0;
        state.zr = b3 & 0x20 != 0;
        state.plus = b3 & 0x40 != 0;
        state.right_stick_press = b3 & 0x80 != 0;
    }

    if let Some(b4) = report.get(BUTTONS_LEFT_OFFSET) {
        state.dpad_down = b4 & 0x01 != 0;
        state.dpad_right = b4 & 0x02 != 0;
        state.dpad_left = b4 & 0x04 != 0;
        state.dpad_up = b4 & 0x08 != 0;
        state.l = b4 & 0x10 != 0;
        state.zl = b4 & 0x20 != 0;
        state.minus = b4 & 0x40 != 0;
        state.left_stick_press = b4 & 0x80 != 0;
    }

    if let Some(b5) = report.get(BUTTONS_SYSTEM_OFFSET) {
        state.home = b5 & 0x01 != 0;
        state.capture = b5 & 0x02 != 0;
        state.paddle_right = b5 & 0x04 != 0;
        state.paddle_left = b5 & 0x08 != 0;
    }

    state.joysticks = decode_joysticks(report, calibration);
    state
}

/// Decodes and normalizes both sticks.
fn decode_joysticks(report: &RawReport, calibration: &CalibrationProfile) -> JoystickValues {
    let mut values = JoystickValues::default();
    let deadzone = calibration.deadzone;

    if let Some((x, y)) = raw_stick(report, Stick::Left) {
        values.lx = normalize_axis(x, &calibration.lx, deadzone);
        values.ly = normalize_axis(y, &calibration.ly, deadzone);
    }

    if let Some((x, y)) = raw_stick(report, Stick::Right) {
        values.rx = normalize_axis(x, &calibration.rx, deadzone);
        values.ry = normalize_axis(y, &calibration.ry, deadzone);
    }

    values
}

/// Returns true if reports with this ID carry stick data.
#[must_use]
pub fn has_stick_data(report_id: u8) -> bool {
    report_id == REPORT_ID_FULL || report_id == REPORT_ID_SIMPLE
}

/// Raw 12-bit `(x, y)` for a stick, or `None` if the report has no data for it.
#[must_use]
pub fn raw_stick(report: &RawReport, stick: Stick) -> Option<(u16, u16)> {
    let report_id = report.report_id()?;
    if !has_stick_data(report_id) {
        return None;
    }
    report.group::<3>(stick.offset()).map(unpack_stick)
}

/// Unpacks a 3-byte stick group into 12-bit `(x, y)`.
#[must_use]
pub fn unpack_stick(group: [u8; 3]) -> (u16, u16) {
    let [b0, b1, b2] = group.map(u16::from);
    let x = b0 | ((b1 & 0x0F) << 8);
    let y = (b1 >> 4) | (b2 << 4);
    (x, y)
}

/// Packs 12-bit `(x, y)` into a 3-byte stick group. Inverse of [`unpack_stick`].
///
/// Values are masked to 12 bits.
#[must_use]
pub fn pack_stick(x: u16, y: u16) -> [u8; 3] {
    let x = x & STICK_RAW_MAX;
    let y = y & STICK_RAW_MAX;
    [
        (x & 0xFF) as u8,
        (((y & 0x0F) << 4) | (x >> 8)) as u8,
        (y >> 4) as u8,
    ]
}
