//! DualShock 4 type definitions
//!
//! This module defines the basic data types used throughout the ds4 module,
//! including the decoded controller snapshot and the output commands.

use serde::{Deserialize, Serialize};

use crate::ds4::constants::{DS4_PRODUCT_IDS, SONY_VENDOR_ID};

/// Analog stick position, re-centered so that 0 is the resting position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stick {
    /// Horizontal axis (-128 = left, 127 = right)
    pub x: i8,

    /// Vertical axis (-128 = up, 127 = down)
    pub y: i8,
}

/// D-pad position as reported by the controller nibble
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DPad {
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
    #[default]
    Neutral,
}

impl DPad {
    /// Map a raw nibble to a direction. Anything past 7 is neutral.
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0 => DPad::Up,
            1 => DPad::UpRight,
            2 => DPad::Right,
            3 => DPad::DownRight,
            4 => DPad::Down,
            5 => DPad::DownLeft,
            6 => DPad::Left,
            7 => DPad::UpLeft,
            _ => DPad::Neutral,
        }
    }

    /// Up indicator: the direction itself and both diagonal neighbours
    pub fn up(self) -> bool {
        matches!(self, DPad::Up | DPad::UpRight | DPad::UpLeft)
    }

    pub fn right(self) -> bool {
        matches!(self, DPad::UpRight | DPad::Right | DPad::DownRight)
    }

    pub fn down(self) -> bool {
        matches!(self, DPad::DownRight | DPad::Down | DPad::DownLeft)
    }

    pub fn left(self) -> bool {
        matches!(self, DPad::DownLeft | DPad::Left | DPad::UpLeft)
    }
}

/// Digital button states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buttons {
    // Face buttons
    pub square: bool,
    pub cross: bool,
    pub circle: bool,
    pub triangle: bool,

    // Shoulder buttons
    pub l1: bool,
    pub r1: bool,
    pub l2: bool,
    pub r2: bool,

    // System buttons
    pub share: bool,
    pub options: bool,
    pub ps: bool,
    pub touchpad: bool,

    // Stick clicks
    pub l3: bool,
    pub r3: bool,

    // D-pad indicators (derived from the D-pad nibble)
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
}

/// Battery estimate read from the status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Coarse percentage in steps of 10 (0-100)
    pub percent: u8,

    /// Cable attached and charging
    pub charging: bool,
}

/// Decoded input report snapshot
///
/// A new value is produced for every report; nothing is updated in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    pub buttons: Buttons,
    pub dpad: DPad,
    pub left_stick: Stick,
    pub right_stick: Stick,

    /// `None` until a report carrying the status byte has been seen
    pub battery: Option<BatteryStatus>,
}

/// Light bar color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    /// Build a color from unbounded integers, clamping each channel to 0-255
    pub fn clamped(red: i32, green: i32, blue: i32) -> Self {
        Self {
            red: clamp_u8(red),
            green: clamp_u8(green),
            blue: clamp_u8(blue),
        }
    }
}

/// Output intent sent to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputCommand {
    /// Rumble intensities; `left` drives the big motor, `right` the small one
    SetMotors { left: u8, right: u8 },

    /// Light bar color at full brightness
    SetColor(Rgb),

    /// Motors and light bar in one report
    SetAll { left: u8, right: u8, color: Rgb },
}

impl OutputCommand {
    pub fn set_motors(left: i32, right: i32) -> Self {
        OutputCommand::SetMotors {
            left: clamp_u8(left),
            right: clamp_u8(right),
        }
    }

    pub fn set_color(red: i32, green: i32, blue: i32) -> Self {
        OutputCommand::SetColor(Rgb::clamped(red, green, blue))
    }

    /// Motors off, light bar off
    pub fn stop() -> Self {
        OutputCommand::SetMotors { left: 0, right: 0 }
    }
}

/// Clamp any integer into the byte range the device accepts
pub fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, u8::MAX as i32) as u8
}

/// Which HID endpoints count as "our" controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub vendor_id: u16,

    /// Accepted product IDs; enumeration order still decides ties
    pub product_ids: Vec<u16>,

    /// Pin a specific endpoint path instead of taking the first match
    pub path: Option<String>,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            vendor_id: SONY_VENDOR_ID,
            product_ids: DS4_PRODUCT_IDS.to_vec(),
            path: None,
        }
    }
}

impl DeviceIdentity {
    pub fn matches(&self, vendor_id: u16, product_id: u16, path: &str) -> bool {
        vendor_id == self.vendor_id
            && self.product_ids.contains(&product_id)
            && self.path.as_deref().map_or(true, |pinned| pinned == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_u8() {
        assert_eq!(clamp_u8(-1), 0);
        assert_eq!(clamp_u8(0), 0);
        assert_eq!(clamp_u8(128), 128);
        assert_eq!(clamp_u8(255), 255);
        assert_eq!(clamp_u8(256), 255);
        assert_eq!(clamp_u8(i32::MIN), 0);
        assert_eq!(clamp_u8(i32::MAX), 255);
    }

    #[test]
    fn test_dpad_out_of_range_is_neutral() {
        for nibble in 8..=15 {
            assert_eq!(DPad::from_nibble(nibble), DPad::Neutral);
        }
    }

    #[test]
    fn test_identity_matching() {
        let identity = DeviceIdentity::default();
        assert!(identity.matches(0x054C, 0x09CC, "/dev/hidraw0"));
        assert!(identity.matches(0x054C, 0x05C4, "/dev/hidraw0"));
        assert!(!identity.matches(0x054C, 0x0CE6, "/dev/hidraw0"));
        assert!(!identity.matches(0x045E, 0x09CC, "/dev/hidraw0"));

        let pinned = DeviceIdentity {
            path: Some("/dev/hidraw3".to_string()),
            ..DeviceIdentity::default()
        };
        assert!(pinned.matches(0x054C, 0x09CC, "/dev/hidraw3"));
        assert!(!pinned.matches(0x054C, 0x09CC, "/dev/hidraw0"));
    }
}
