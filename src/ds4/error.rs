//! Error types for the DualShock 4 driver

use thiserror::Error;

use crate::transport::TransportError;

/// Input report could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Short input report: {len} bytes, need at least {required}")]
    ShortReport { len: usize, required: usize },
}

#[derive(Debug, Error)]
pub enum Ds4Error {
    #[error("No DualShock 4 controller found")]
    DeviceNotFound,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A device operation was issued while no session is open
    #[error("Controller is not connected")]
    NotConnected,

    #[error("Battery level unavailable after {attempts} attempts")]
    BatteryUnavailable { attempts: u32 },

    #[error("Unknown vibration pattern: {0}")]
    UnknownPattern(String),

    #[error("Device worker is not running")]
    WorkerStopped,

    #[error("Failed to start device worker: {0}")]
    Runtime(#[from] std::io::Error),
}

impl Ds4Error {
    /// Whether the error closed the session
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Ds4Error::Transport(_))
    }
}
