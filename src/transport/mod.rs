//! Transport abstraction for raw HID access
//!
//! This module provides a unified interface over the platform HID facility
//! so the session can be driven by real hardware or by a scripted mock.

pub mod hid;
pub mod mock;

pub use hid::HidApiTransport;
pub use mock::{MockRead, MockTransport};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("HID enumeration failed: {0}")]
    Enumerate(String),

    #[error("Failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("HID read failed: {0}")]
    Read(String),

    #[error("HID write failed: {0}")]
    Write(String),

    #[error("Device handle is closed")]
    Closed,
}

/// One enumerated HID endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidEndpoint {
    pub vendor_id: u16,
    pub product_id: u16,
    pub path: String,

    #[serde(default)]
    pub product: Option<String>,
}

/// Device discovery and opening
pub trait Transport {
    type Handle: TransportHandle;

    /// List every HID endpoint currently visible, in platform order
    fn enumerate(&mut self) -> Result<Vec<HidEndpoint>, TransportError>;

    /// Open an endpoint by path
    fn open(&mut self, path: &str) -> Result<Self::Handle, TransportError>;
}

/// An open device
pub trait TransportHandle {
    /// Switch reads to non-blocking mode
    fn set_nonblocking(&mut self) -> Result<(), TransportError>;

    /// Read one report into `buf`; `Ok(0)` means nothing was pending
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write one report
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Release the handle
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// Every endpoint from `vendor_id`, matching or not
pub fn list_endpoints<T: Transport>(
    transport: &mut T,
    vendor_id: u16,
) -> Result<Vec<HidEndpoint>, TransportError> {
    Ok(transport
        .enumerate()?
        .into_iter()
        .filter(|endpoint| endpoint.vendor_id == vendor_id)
        .collect())
}
