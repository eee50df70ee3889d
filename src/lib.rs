//! ds4-rs: DualShock 4 driver over raw HID
//!
//! This library discovers a DualShock 4 controller, decodes its input reports
//! into controller snapshots and encodes rumble and light bar commands, with a
//! single device thread serializing all access to the handle.

pub mod config;
pub mod ds4;
pub mod event;
pub mod manager;
pub mod transport;
pub mod worker;

// Re-export commonly used items
pub use config::Config;
pub use ds4::{BatteryStatus, ControllerState, Ds4Error, OutputCommand, VibrationPattern};
pub use event::{DisconnectReason, Ds4Event, Ds4Observer, EventQueue};
pub use manager::Ds4Manager;
pub use transport::{HidApiTransport, MockTransport, Transport};
