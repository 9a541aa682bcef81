//! # Startup Handshake
//!
//! Vendor configuration frames written to the bulk-OUT endpoint after the
//! interface is claimed. The payloads are opaque: they were captured from
//! working hosts and must be sent byte-for-byte in this order.

use std::time::Duration;

/// Delay after each configuration frame
pub const INIT_PACKET_DELAY: Duration = Duration::from_millis(15);

/// Timeout for the opportunistic IN drain after each frame
pub const INIT_DRAIN_TIMEOUT: Duration = Duration::from_millis(5);

/// Settle time after each raw-HID mode command
pub const HID_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Wait between handshake completion and the first player-light command
pub const PLAYER_LIGHTS_DELAY: Duration = Duration::from_millis(100);

/// Timeout applied to each bulk write
pub const USB_WRITE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Subcommand selecting the input report mode
pub const SUBCMD_SET_REPORT_MODE: u8 = 0x03;

/// Argument for full-state reports (report ID 0x30)
pub const REPORT_MODE_FULL: u8 = 0x30;

/// Argument for the polling frequency switch
pub const REPORT_MODE_FREQUENCY: u8 = 0x31;

/// Ordered vendor configuration frames.
pub const INIT_SEQUENCE: &[&[u8]] = &[
    &[0x03, 0x91, 0x00, 0x0d, 0x00, 0x08, 0x00, 0x00, 0x01, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
    &[0x07, 0x91, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
    &[0x16, 0x91, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
    &[
        0x15, 0x91, 0x00, 0x01, 0x00, 0x0e, 0x00, 0x00, 0x00, 0x02, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    ],
    &[
        0x15, 0x91, 0x00, 0x02, 0x00, 0x11, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    ],
    &[0x15, 0x91, 0x00, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00],
    &[0x09, 0x91, 0x00, 0x07, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    &[0x0c, 0x91, 0x00, 0x02, 0x00, 0x04, 0x00, 0x00, 0x27, 0x00, 0x00, 0x00],
    &[0x11, 0x91, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00],
    &[
        0x0a, 0x91, 0x00, 0x08, 0x00, 0x14, 0x00, 0x00, 0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x35, 0x00, 0x46, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ],
    &[0x0c, 0x91, 0x00, 0x04, 0x00, 0x04, 0x00, 0x00, 0x27, 0x00, 0x00, 0x00],
    &[0x03, 0x91, 0x00, 0x0a, 0x00, 0x04, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00],
    &[0x10, 0x91, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
    &[0x01, 0x91, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x00],
    &[0x03, 0x91, 0x00, 0x01, 0x00, 0x00, 0x00],
    &[0x0a, 0x91, 0x00, 0x02, 0x00, 0x04, 0x00, 0x00, 0x03, 0x00, 0x00],
    &[0x09, 0x91, 0x00, 0x07, 0x00, 0x08, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
];
