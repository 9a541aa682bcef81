//! # Pro Controller 2 Protocol Module
//!
//! Wire-level definitions for the wired Nintendo Pro Controller 2 family.
//!
//! This module handles:
//! - Vendor / product identification and the USB interface layout
//! - The opaque vendor configuration frames sent over bulk-OUT at startup
//! - Output report framing for subcommands (report mode, player lights)
//! - Input report layout constants used by the decoder

pub mod constants;
pub mod handshake;
pub mod subcommand;
