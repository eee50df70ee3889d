//! DualShock 4 controller support
//!
//! This module provides the device-specific core:
//! - Report codec (input decoding, output encoding)
//! - Session lifecycle over a HID transport
//! - Timed vibration patterns

pub mod codec;
pub mod constants;
pub mod error;
pub mod session;
pub mod types;
pub mod vibration;

// Re-export commonly used items
pub use codec::{decode, encode, encode_color, encode_motors, OutputReport};
pub use constants::*;
pub use error::{DecodeError, Ds4Error};
pub use session::{ConnectedDevice, DeviceSession, ReadOutcome, SessionSettings, SessionState};
pub use types::*;
pub use vibration::{SequencerState, VibrationPattern, VibrationSequencer, VibrationStep};
