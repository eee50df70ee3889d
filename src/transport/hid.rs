//! `hidapi` backed transport
//!
//! Thin wrapper over the platform HID library. The library context is created
//! lazily on first use and refreshed on every enumeration.

use hidapi::{HidApi, HidDevice, HidError};
use log::debug;
use std::ffi::CString;

use super::{HidEndpoint, Transport, TransportError, TransportHandle};

/// Real HID transport
#[derive(Default)]
pub struct HidApiTransport {
    api: Option<HidApi>,
}

impl HidApiTransport {
    pub fn new() -> Self {
        Self { api: None }
    }

    fn api(&mut self) -> Result<&mut HidApi, TransportError> {
        if self.api.is_none() {
            let api = HidApi::new().map_err(|e| TransportError::Enumerate(e.to_string()))?;
            self.api = Some(api);
        }
        self.api
            .as_mut()
            .ok_or_else(|| TransportError::Enumerate("HID API unavailable".into()))
    }
}

impl Transport for HidApiTransport {
    type Handle = HidApiHandle;

    fn enumerate(&mut self) -> Result<Vec<HidEndpoint>, TransportError> {
        let api = self.api()?;
        api.refresh_devices()
            .map_err(|e| TransportError::Enumerate(e.to_string()))?;

        let endpoints = api
            .device_list()
            .map(|info| HidEndpoint {
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                path: info.path().to_string_lossy().into_owned(),
                product: info.product_string().map(str::to_string),
            })
            .collect::<Vec<_>>();

        debug!("Enumerated {} HID endpoints", endpoints.len());
        Ok(endpoints)
    }

    fn open(&mut self, path: &str) -> Result<Self::Handle, TransportError> {
        let open_error = |reason: String| TransportError::Open {
            path: path.to_string(),
            reason,
        };

        let c_path = CString::new(path).map_err(|e| open_error(e.to_string()))?;
        let device = self
            .api()?
            .open_path(&c_path)
            .map_err(|e| open_error(e.to_string()))?;

        Ok(HidApiHandle { device })
    }
}

/// Open `hidapi` device
pub struct HidApiHandle {
    device: HidDevice,
}

impl TransportHandle for HidApiHandle {
    fn set_nonblocking(&mut self) -> Result<(), TransportError> {
        self.device
            .set_blocking_mode(false)
            .map_err(|e: HidError| TransportError::Read(e.to_string()))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.device
            .read(buf)
            .map_err(|e| TransportError::Read(e.to_string()))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.device
            .write(data)
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    fn close(self) {
        // hid_close runs when the device is dropped
        drop(self.device);
    }
}
