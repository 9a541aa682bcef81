//! # Procon Bridge Library
//!
//! Userspace Linux driver for wired Nintendo Pro Controller 2 pads.
//!
//! The controller stays silent on USB until it receives a vendor handshake.
//! This library performs that handshake, reads input reports from the
//! matching hidraw node and re-emits them through a uinput virtual gamepad
//! that games and emulators recognize, one per connected controller.

pub mod config;
pub mod controller;
pub mod error;
pub mod hid;
pub mod manager;
pub mod platform;
pub mod protocol;
pub mod session;
pub mod uinput;
pub mod usb;
