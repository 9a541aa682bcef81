//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; anything left out takes the
//! built-in default.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::controller::calibration::{CalibrationProfile, DEFAULT_CALIBRATION};
use crate::error::{BridgeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub virtual_device: VirtualDeviceConfig,

    /// Stick calibration override; the factory table is used when absent
    #[serde(default)]
    pub calibration: Option<CalibrationProfile>,
}

/// Device discovery configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScanConfig {
    #[serde(default = "default_scan_interval_ms")]
    pub interval_ms: u64,
}

/// Per-device polling configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PollConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Consecutive failed reads tolerated before a device counts as unplugged
    #[serde(default = "default_max_read_failures")]
    pub max_read_failures: u32,
}

/// Virtual gamepad configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VirtualDeviceConfig {
    /// Base name; " (Player N)" is appended per device
    #[serde(default = "default_device_name")]
    pub name: String,

    #[serde(default = "default_output_deadzone")]
    pub output_deadzone: f32,
}

// Default value functions
fn default_scan_interval_ms() -> u64 { 2000 }

fn default_tick_ms() -> u64 { 2 }
fn default_read_timeout_ms() -> u64 { 100 }
fn default_max_read_failures() -> u32 { 20 }

fn default_device_name() -> String { "Nintendo Pro Controller 2".to_string() }
fn default_output_deadzone() -> f32 { 0.05 }

/// Longest base name that still fits the kernel's 80-byte device name
const MAX_DEVICE_NAME_LEN: usize = 60;

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_scan_interval_ms(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            max_read_failures: default_max_read_failures(),
        }
    }
}

impl Default for VirtualDeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            output_deadzone: default_output_deadzone(),
        }
    }
}

impl ScanConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl PollConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn invalid(message: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use procon_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Calibration profile handed to each session
    pub fn calibration_profile(&self) -> CalibrationProfile {
        self.calibration.unwrap_or(DEFAULT_CALIBRATION)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.scan.interval_ms < 100 || self.scan.interval_ms > 60000 {
            return Err(invalid("scan interval_ms must be between 100 and 60000"));
        }

        if self.poll.tick_ms == 0 || self.poll.tick_ms > 1000 {
            return Err(invalid("poll tick_ms must be between 1 and 1000"));
        }

        if self.poll.read_timeout_ms == 0 || self.poll.read_timeout_ms > 10000 {
            return Err(invalid("poll read_timeout_ms must be between 1 and 10000"));
        }

        if self.poll.max_read_failures == 0 {
            return Err(invalid("poll max_read_failures must be greater than 0"));
        }

        if self.virtual_device.name.trim().is_empty() {
            return Err(invalid("virtual_device name cannot be empty"));
        }

        if self.virtual_device.name.len() > MAX_DEVICE_NAME_LEN {
            return Err(invalid(format!(
                "virtual_device name must be at most {} bytes",
                MAX_DEVICE_NAME_LEN
            )));
        }

        let deadzone = self.virtual_device.output_deadzone;
        if !(0.0..=0.25).contains(&deadzone) {
            return Err(invalid("virtual_device output_deadzone must be between 0.0 and 0.25"));
        }

        if let Some(calibration) = &self.calibration {
            calibration.validate().map_err(invalid)?;
        }

        Ok(())
    }
}
