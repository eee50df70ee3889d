//! DualShock 4 protocol constants
//!
//! This module contains all the constants needed for DualShock 4 communication:
//! - USB/HID vendor and product identifiers
//! - Input report offsets and bit masks
//! - Output report layout
//! - Timing defaults

// ============================================================================
// Device Identity
// ============================================================================

/// Sony Interactive Entertainment vendor ID
pub const SONY_VENDOR_ID: u16 = 0x054C;

/// DualShock 4 (second revision, CUH-ZCT2)
pub const DS4_V2_PRODUCT_ID: u16 = 0x09CC;

/// DualShock 4 (first revision, CUH-ZCT1)
pub const DS4_V1_PRODUCT_ID: u16 = 0x05C4;

/// Sony USB wireless adaptor for DualShock 4
pub const DS4_WIRELESS_ADAPTOR_PRODUCT_ID: u16 = 0x0BA0;

/// Accepted product IDs, in preference order
pub const DS4_PRODUCT_IDS: [u16; 3] = [
    DS4_V2_PRODUCT_ID,
    DS4_V1_PRODUCT_ID,
    DS4_WIRELESS_ADAPTOR_PRODUCT_ID,
];

// ============================================================================
// Input Report (device -> host)
// ============================================================================

/// Read buffer size for one input report
pub const INPUT_REPORT_SIZE: usize = 64;

/// Left stick X axis
pub const LEFT_STICK_X_OFFSET: usize = 1;
/// Left stick Y axis
pub const LEFT_STICK_Y_OFFSET: usize = 2;
/// Right stick X axis
pub const RIGHT_STICK_X_OFFSET: usize = 3;
/// Right stick Y axis
pub const RIGHT_STICK_Y_OFFSET: usize = 4;

/// Low nibble: D-pad, high nibble: face buttons
pub const DPAD_FACE_OFFSET: usize = 5;

/// Shoulders, triggers, share/options and stick clicks
pub const SHOULDER_OFFSET: usize = 6;

/// PS and touchpad click in bits 0-1
pub const SYSTEM_OFFSET: usize = 7;

/// Low nibble: battery level (tenths), bit 4: cable/charging
pub const BATTERY_OFFSET: usize = 30;

/// Shortest report that covers every field the decoder reads
pub const MIN_INPUT_REPORT_LEN: usize = BATTERY_OFFSET + 1;

/// Unsigned axis value that maps to a centered stick
pub const STICK_CENTER: i16 = 128;

/// D-pad nibble value reported when no direction is held
pub const DPAD_NEUTRAL: u8 = 0x08;

// Face buttons (high nibble of DPAD_FACE_OFFSET, after shifting down)
pub const FACE_SQUARE: u8 = 0x01;
pub const FACE_CROSS: u8 = 0x02;
pub const FACE_CIRCLE: u8 = 0x04;
pub const FACE_TRIANGLE: u8 = 0x08;

// SHOULDER_OFFSET bits
pub const BTN_L1: u8 = 0x01;
pub const BTN_R1: u8 = 0x02;
pub const BTN_L2: u8 = 0x04;
pub const BTN_R2: u8 = 0x08;
pub const BTN_SHARE: u8 = 0x10;
pub const BTN_OPTIONS: u8 = 0x20;
pub const BTN_L3: u8 = 0x40;
pub const BTN_R3: u8 = 0x80;

// SYSTEM_OFFSET bits
pub const BTN_PS: u8 = 0x01;
pub const BTN_TOUCHPAD: u8 = 0x02;

pub const BATTERY_LEVEL_MASK: u8 = 0x0F;
pub const BATTERY_CHARGING_MASK: u8 = 0x10;

// ============================================================================
// Output Report (host -> device)
// ============================================================================

/// Output report length, report ID included
pub const OUTPUT_REPORT_SIZE: usize = 14;

/// USB output report ID
pub const OUTPUT_REPORT_ID: u8 = 0x05;

/// Feature enable flags written at byte 1
pub const OUTPUT_ENABLE_FLAGS: u8 = 0x01;

pub const OUT_REPORT_ID_INDEX: usize = 0;
pub const OUT_FLAGS_INDEX: usize = 1;
/// Big (left) motor
pub const OUT_LEFT_MOTOR_INDEX: usize = 5;
/// Small (right) motor
pub const OUT_RIGHT_MOTOR_INDEX: usize = 6;
pub const OUT_LED_RED_INDEX: usize = 7;
pub const OUT_LED_GREEN_INDEX: usize = 8;
pub const OUT_LED_BLUE_INDEX: usize = 9;
pub const OUT_LED_BRIGHTNESS_INDEX: usize = 10;

/// Brightness byte written whenever a color is set
pub const LED_FULL_BRIGHTNESS: u8 = 0xFF;

// ============================================================================
// Timing Constants
// ============================================================================

/// Poll cadence (milliseconds), roughly 20 Hz
pub const POLL_INTERVAL_MS: u64 = 50;

/// Battery query attempts before giving up
pub const BATTERY_READ_RETRIES: u32 = 5;

/// Pause between battery query attempts (milliseconds)
pub const BATTERY_RETRY_BACKOFF_MS: u64 = 100;
