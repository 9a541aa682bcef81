//! # Protocol Constants
//!
//! Device identification and report layout for the Pro Controller 2 family.
//! These values are specific to this hardware and are not configurable.

/// Nintendo vendor ID
pub const NINTENDO_VENDOR_ID: u16 = 0x057e;

/// Product IDs accepted during discovery (standard units and known clones)
pub const SUPPORTED_PRODUCT_IDS: &[u16] = &[0x2009, 0x2019, 0x2069];

/// Product ID advertised by the virtual gamepad
pub const VIRTUAL_PRODUCT_ID: u16 = 0x2019;

/// Version advertised by the virtual gamepad
pub const VIRTUAL_VERSION: u16 = 1;

/// USB configuration value carrying the vendor interface
pub const USB_CONFIGURATION: u8 = 1;

/// USB interface number of the vendor bulk interface
pub const USB_INTERFACE: u8 = 1;

/// Maximum size of a HID report in either direction
pub const REPORT_SIZE: usize = 64;

/// Maximum number of simultaneously driven controllers
pub const MAX_PLAYERS: usize = 4;

/// Input report IDs carrying stick data
pub const REPORT_ID_FULL: u8 = 0x30;
/// Alternate input report ID with the same stick layout
pub const REPORT_ID_SIMPLE: u8 = 0x09;

/// Offsets of the three button bytes in an input report
pub const BUTTONS_RIGHT_OFFSET: usize = 3;
/// D-pad, left shoulder and minus
pub const BUTTONS_LEFT_OFFSET: usize = 4;
/// Home, capture and paddles
pub const BUTTONS_SYSTEM_OFFSET: usize = 5;

/// Offset of the packed left stick group (3 bytes)
pub const LEFT_STICK_OFFSET: usize = 6;
/// Offset of the packed right stick group (3 bytes)
pub const RIGHT_STICK_OFFSET: usize = 9;

/// Largest value a 12-bit stick axis can carry
pub const STICK_RAW_MAX: u16 = 0x0FFF;

/// Returns true if `product_id` belongs to a supported controller.
#[must_use]
pub fn is_supported(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == NINTENDO_VENDOR_ID && SUPPORTED_PRODUCT_IDS.contains(&product_id)
}
