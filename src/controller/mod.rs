//! # Controller Module
//!
//! Pro Controller 2 input decoding.
//!
//! This module handles:
//! - Holding raw HID reports in a bounded buffer
//! - Decoding button bytes and packed 12-bit stick values
//! - Calibrating sticks to normalized -1.0..1.0 values
//!
//! Everything here is pure; no I/O happens in this module.

pub mod calibration;
pub mod decoder;
pub mod report;
pub mod state;

pub use calibration::{CalibrationProfile, DEFAULT_CALIBRATION};
pub use decoder::decode;
pub use report::RawReport;
pub use state::{ControllerState, JoystickValues};
