//! # Error Types
//!
//! Custom error types for Procon Bridge using `thiserror`.

use std::time::Duration;
use thiserror::Error;

/// Main error type for Procon Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A device node (hidraw, input event) could not be located
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// USB configuration or interface could not be claimed
    #[error("Failed to claim USB interface: {0}")]
    Claim(String),

    /// A write failed while initializing the controller
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// No report arrived within the read timeout
    #[error("Read timed out after {0:?}")]
    ReadTimeout(Duration),

    /// Every player slot is occupied
    #[error("All {0} player slots are in use")]
    SlotExhaustion(usize),

    /// uinput device creation or emission failed
    #[error("Virtual device error: {0}")]
    VirtualDevice(String),

    /// USB enumeration or transfer errors
    #[error("USB error: {0}")]
    Usb(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Procon Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
