//! # Calibration Module
//!
//! Maps raw 12-bit stick readings to normalized values.
//!
//! ## Three-Point Curve
//!
//! Each axis is described by the raw reading at rest (`center`) and at both
//! extremes (`min`, `max`). Readings are mapped piecewise-linearly:
//!
//! | Raw | Normalized |
//! |-----|------------|
//! | `min` | -1.0 |
//! | `center` | 0.0 |
//! | `max` | 1.0 |
//!
//! ## Deadzone
//!
//! Readings within `deadzone` raw units of center map to exactly 0.0. Outside
//! the deadzone the remaining half-range is rescaled so that full deflection
//! still reaches ±1.0. Readings past `min`/`max` are clamped.
//!
//! ## Usage
//!
//! ```
//! use procon_bridge::controller::calibration::{AxisCalibration, normalize_axis};
//!
//! let axis = AxisCalibration::new(2000, 1000, 3000);
//!
//! assert_eq!(normalize_axis(2040, &axis, 50), 0.0);
//! assert_eq!(normalize_axis(3000, &axis, 50), 1.0);
//! assert_eq!(normalize_axis(500, &axis, 50), -1.0);
//! ```

use serde::Deserialize;

use crate::protocol::constants::STICK_RAW_MAX;

/// Calibration of a single stick axis in raw sensor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AxisCalibration {
    /// Reading with the stick at rest.
    pub center: u16,
    /// Reading at full negative deflection.
    pub min: u16,
    /// Reading at full positive deflection.
    pub max: u16,
}

impl AxisCalibration {
    /// Creates an axis calibration.
    #[must_use]
    pub const fn new(center: u16, min: u16, max: u16) -> Self {
        Self { center, min, max }
    }

    /// Checks `min <= center <= max` and that all values fit in 12 bits.
    pub fn validate(&self, name: &str) -> std::result::Result<(), String> {
        if self.min > self.center || self.center > self.max {
            return Err(format!(
                "{} calibration must satisfy min <= center <= max (got {} / {} / {})",
                name, self.min, self.center, self.max
            ));
        }
        if self.max > STICK_RAW_MAX {
            return Err(format!(
                "{} calibration max {} exceeds 12-bit range",
                name, self.max
            ));
        }
        Ok(())
    }
}

/// Calibration for both sticks plus a shared deadzone.
///
/// Profiles are `Copy`; each session receives its own value so a profile can
/// never change underneath a running device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CalibrationProfile {
    /// Left stick X
    pub lx: AxisCalibration,
    /// Left stick Y
    pub ly: AxisCalibration,
    /// Right stick X
    pub rx: AxisCalibration,
    /// Right stick Y
    pub ry: AxisCalibration,
    /// Deadzone around center, in raw units.
    pub deadzone: u16,
}

/// Factory calibration measured on a reference controller.
pub const DEFAULT_CALIBRATION: CalibrationProfile = CalibrationProfile {
    lx: AxisCalibration::new(2063, 294, 3735),
    ly: AxisCalibration::new(2161, 512, 3733),
    rx: AxisCalibration::new(2142, 407, 3628),
    ry: AxisCalibration::new(2050, 368, 3854),
    deadzone: 50,
};

impl Default for CalibrationProfile {
    fn default() -> Self {
        DEFAULT_CALIBRATION
    }
}

impl CalibrationProfile {
    /// Validates every axis and the deadzone.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.lx.validate("lx")?;
        self.ly.validate("ly")?;
        self.rx.validate("rx")?;
        self.ry.validate("ry")?;
        if self.deadzone > STICK_RAW_MAX {
            return Err(format!(
                "deadzone {} exceeds 12-bit range",
                self.deadzone
            ));
        }
        Ok(())
    }
}

/// Normalizes a raw 12-bit reading to -1.0..1.0.
///
/// # Arguments
///
/// * `raw` - Raw reading from the report
/// * `axis` - Calibration for this axis
/// * `deadzone` - Deadzone around center in raw units
///
/// # Returns
///
/// 0.0 inside the deadzone or when the relevant half-range is empty,
/// otherwise the rescaled position clamped to -1.0..1.0.
///
/// # Examples
///
/// ```
/// use procon_bridge::controller::calibration::{AxisCalibration, normalize_axis};
///
/// let axis = AxisCalibration::new(2000, 1000, 3000);
/// let value = normalize_axis(2060, &axis, 50);
/// assert!((value - 0.0105).abs() < 0.001);
///
/// // Degenerate half-range never divides by zero
/// let flat = AxisCalibration::new(2000, 2000, 3000);
/// assert_eq!(normalize_axis(1500, &flat, 50), 0.0);
/// ```
#[must_use]
pub fn normalize_axis(raw: u16, axis: &AxisCalibration, deadzone: u16) -> f32 {
    let offset = i32::from(raw) - i32::from(axis.center);
    let deadzone = i32::from(deadzone);

    if offset.abs() <= deadzone {
        return 0.0;
    }

    let half_range = if offset > 0 {
        i32::from(axis.max) - i32::from(axis.center)
    } else {
        i32::from(axis.center) - i32::from(axis.min)
    };
    if half_range <= 0 {
        return 0.0;
    }

    let sign = offset.signum() as f32;
    let span = half_range - deadzone;
    if span <= 0 {
        // Deadzone swallows the whole half-range; anything past it is full deflection
        return sign;
    }

    let magnitude = (offset.abs() - deadzone) as f32 / span as f32;
    sign * magnitude.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_axis() -> AxisCalibration {
        AxisCalibration::new(2000, 1000, 3000)
    }

    // ==================== Anchor Tests ====================

    #[test]
    fn test_center_is_zero() {
        assert_eq!(normalize_axis(2000, &scenario_axis(), 50), 0.0);
    }

    #[test]
    fn test_deadzone_edges_are_zero() {
        let axis = scenario_axis();
        assert_eq!(normalize_axis(2050, &axis, 50), 0.0);
        assert_eq!(normalize_axis(1950, &axis, 50), 0.0);
        assert_eq!(normalize_axis(2040, &axis, 50), 0.0);
    }

    #[test]
    fn test_extremes() {
        let axis = scenario_axis();
        assert_eq!(normalize_axis(1000, &axis, 50), -1.0);
        assert_eq!(normalize_axis(3000, &axis, 50), 1.0);
    }

    #[test]
    fn test_just_outside_deadzone() {
        let value = normalize_axis(2060, &scenario_axis(), 50);
        assert!((value - 0.01).abs() < 0.001, "got {}", value);
    }

    #[test]
    fn test_clamped_beyond_range() {
        let axis = scenario_axis();
        assert_eq!(normalize_axis(500, &axis, 50), -1.0);
        assert_eq!(normalize_axis(4095, &axis, 50), 1.0);
        assert_eq!(normalize_axis(0, &axis, 50), -1.0);
    }

    #[test]
    fn test_no_deadzone_is_plain_linear() {
        let axis = scenario_axis();
        assert!((normalize_axis(2500, &axis, 0) - 0.5).abs() < 1e-6);
        assert!((normalize_axis(1250, &axis, 0) + 0.75).abs() < 1e-6);
    }

    // ==================== Guard Tests ====================

    #[test]
    fn test_zero_half_range_returns_zero() {
        let low_flat = AxisCalibration::new(2000, 2000, 3000);
        assert_eq!(normalize_axis(1000, &low_flat, 0), 0.0);
        assert!(normalize_axis(2500, &low_flat, 0) > 0.0);

        let high_flat = AxisCalibration::new(2000, 1000, 2000);
        assert_eq!(normalize_axis(3000, &high_flat, 0), 0.0);
        assert!(normalize_axis(1500, &high_flat, 0) < 0.0);
    }

    #[test]
    fn test_deadzone_wider_than_half_range() {
        let axis = AxisCalibration::new(2000, 1990, 2010);
        assert_eq!(normalize_axis(2005, &axis, 50), 0.0);
        assert_eq!(normalize_axis(2100, &axis, 50), 1.0);
        assert_eq!(normalize_axis(1900, &axis, 50), -1.0);
    }

    // ==================== Property Tests ====================

    #[test]
    fn test_monotonic_over_full_range() {
        let axis = DEFAULT_CALIBRATION.lx;
        let mut previous = normalize_axis(0, &axis, 50);
        for raw in 1..=STICK_RAW_MAX {
            let value = normalize_axis(raw, &axis, 50);
            assert!(
                value >= previous,
                "not monotonic at raw {}: {} < {}",
                raw,
                value,
                previous
            );
            previous = value;
        }
    }

    #[test]
    fn test_odd_symmetry() {
        let axis = scenario_axis();
        for delta in (0..=1200u16).step_by(7) {
            let up = normalize_axis(2000 + delta, &axis, 50);
            let down = normalize_axis(2000 - delta.min(2000), &axis, 50);
            assert!((up + down).abs() < 1e-6, "asymmetric at delta {}", delta);
        }
    }

    #[test]
    fn test_output_always_in_range() {
        let axis = DEFAULT_CALIBRATION.ry;
        for raw in 0..=STICK_RAW_MAX {
            let value = normalize_axis(raw, &axis, DEFAULT_CALIBRATION.deadzone);
            assert!((-1.0..=1.0).contains(&value));
        }
    }

    // ==================== Profile Tests ====================

    #[test]
    fn test_default_profile_is_valid() {
        assert!(DEFAULT_CALIBRATION.validate().is_ok());
        assert_eq!(CalibrationProfile::default(), DEFAULT_CALIBRATION);
        assert_eq!(DEFAULT_CALIBRATION.deadzone, 50);
        assert_eq!(DEFAULT_CALIBRATION.lx, AxisCalibration::new(2063, 294, 3735));
    }

    #[test]
    fn test_invalid_axis_order() {
        let mut profile = DEFAULT_CALIBRATION;
        profile.ly = AxisCalibration::new(100, 200, 3000);
        let err = profile.validate().unwrap_err();
        assert!(err.contains("ly"));
    }

    #[test]
    fn test_axis_exceeding_twelve_bits() {
        let mut profile = DEFAULT_CALIBRATION;
        profile.rx = AxisCalibration::new(2000, 100, 5000);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_deadzone_too_large() {
        let mut profile = DEFAULT_CALIBRATION;
        profile.deadzone = 5000;
        assert!(profile.validate().is_err());
    }
}
