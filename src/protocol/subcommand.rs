//! # Subcommand Framing
//!
//! Output report 0x01 carries a subcommand together with neutral rumble data:
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | Report ID (0x01) |
//! | 1 | Packet counter (low 4 bits) |
//! | 2..10 | Neutral rumble (`00 01 40 40 00 01 40 40`) |
//! | 10 | Subcommand ID |
//! | 11.. | Subcommand arguments |
//!
//! The counter lets the controller discard duplicated or out-of-order commands.

use super::constants::REPORT_SIZE;

/// Output report ID for rumble + subcommand
pub const OUTPUT_REPORT_SUBCOMMAND: u8 = 0x01;

/// Neutral rumble block sent with every subcommand
pub const NEUTRAL_RUMBLE: [u8; 8] = [0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40];

/// Subcommand setting the player indicator lights
pub const SUBCMD_SET_PLAYER_LIGHTS: u8 = 0x30;

/// Offset of the subcommand ID in the output report
const SUBCMD_OFFSET: usize = 10;

/// Rolling 4-bit packet counter.
///
/// The counter is advanced *before* each frame, so the first frame built by a
/// fresh counter carries 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketCounter(u8);

impl PacketCounter {
    /// Creates a counter starting at `value` (masked to 4 bits).
    #[must_use]
    pub fn starting_at(value: u8) -> Self {
        Self(value & 0x0F)
    }

    /// Current value, as carried by the last frame.
    #[must_use]
    pub fn current(&self) -> u8 {
        self.0
    }

    /// Advances and returns the counter for the next frame.
    pub fn advance(&mut self) -> u8 {
        self.0 = (self.0 + 1) & 0x0F;
        self.0
    }
}

/// Encodes a subcommand frame with no padding.
///
/// # Examples
///
/// ```
/// use procon_bridge::protocol::subcommand::encode_subcommand;
///
/// let frame = encode_subcommand(0, 0x03, &[0x30]);
/// assert_eq!(frame, vec![0x01, 0x00, 0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40, 0x03, 0x30]);
/// ```
#[must_use]
pub fn encode_subcommand(counter: u8, subcmd: u8, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(SUBCMD_OFFSET + 1 + data.len());
    frame.push(OUTPUT_REPORT_SUBCOMMAND);
    frame.push(counter & 0x0F);
    frame.extend_from_slice(&NEUTRAL_RUMBLE);
    frame.push(subcmd);
    frame.extend_from_slice(data);
    frame
}

/// Encodes a subcommand frame zero-padded to a full 64-byte report.
///
/// Arguments that do not fit are truncated.
#[must_use]
pub fn encode_subcommand_report(counter: u8, subcmd: u8, data: &[u8]) -> [u8; REPORT_SIZE] {
    let mut report = [0u8; REPORT_SIZE];
    let frame = encode_subcommand(counter, subcmd, data);
    let len = frame.len().min(REPORT_SIZE);
    report[..len].copy_from_slice(&frame[..len]);
    report
}

/// One-hot light pattern for a 1-based player number.
///
/// Players 1-4 light a single LED; any other value falls back to player 1.
///
/// # Examples
///
/// ```
/// use procon_bridge::protocol::subcommand::player_light_pattern;
///
/// assert_eq!(player_light_pattern(3), 0x04);
/// assert_eq!(player_light_pattern(9), 0x01);
/// ```
#[must_use]
pub fn player_light_pattern(player: u8) -> u8 {
    match player {
        1 => 0x01, // ●○○○
        2 => 0x02, // ○●○○
        3 => 0x04, // ○○●○
        4 => 0x08, // ○○○●
        _ => 0x01,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_starts_at_one() {
        let mut counter = PacketCounter::default();
        assert_eq!(counter.advance(), 1);
        assert_eq!(counter.advance(), 2);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn test_counter_wraps_at_four_bits() {
        let mut counter = PacketCounter::starting_at(0x0E);
        assert_eq!(counter.advance(), 0x0F);
        assert_eq!(counter.advance(), 0x00);
        assert_eq!(counter.advance(), 0x01);
    }

    #[test]
    fn test_starting_at_masks_value() {
        assert_eq!(PacketCounter::starting_at(0x13).current(), 0x03);
    }

    #[test]
    fn test_encode_report_mode_frame() {
        let frame = encode_subcommand(1, 0x03, &[0x31]);
        assert_eq!(
            frame,
            vec![0x01, 0x01, 0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40, 0x03, 0x31]
        );
    }

    #[test]
    fn test_encode_masks_counter() {
        let frame = encode_subcommand(0x1A, SUBCMD_SET_PLAYER_LIGHTS, &[]);
        assert_eq!(frame[1], 0x0A);
    }

    #[test]
    fn test_padded_report_layout() {
        let report = encode_subcommand_report(5, SUBCMD_SET_PLAYER_LIGHTS, &[0x08]);
        assert_eq!(report.len(), 64);
        assert_eq!(report[0], 0x01);
        assert_eq!(report[1], 5);
        assert_eq!(report[2..10], NEUTRAL_RUMBLE);
        assert_eq!(report[10], 0x30);
        assert_eq!(report[11], 0x08);
        assert!(report[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_padded_report_truncates_long_arguments() {
        let data = [0xAA; 80];
        let report = encode_subcommand_report(0, 0x10, &data);
        assert_eq!(report[63], 0xAA);
    }

    #[test]
    fn test_player_light_patterns() {
        assert_eq!(player_light_pattern(1), 0x01);
        assert_eq!(player_light_pattern(2), 0x02);
        assert_eq!(player_light_pattern(3), 0x04);
        assert_eq!(player_light_pattern(4), 0x08);
    }

    #[test]
    fn test_player_light_fallback() {
        assert_eq!(player_light_pattern(0), 0x01);
        assert_eq!(player_light_pattern(5), 0x01);
        assert_eq!(player_light_pattern(255), 0x01);
    }
}
