//! DualShock 4 session management
//!
//! This module owns the open HID handle: discovery, connect/disconnect,
//! battery queries, report reads and command writes.

use log::{debug, info, warn};
use std::thread;
use std::time::Duration;

use crate::ds4::codec;
use crate::ds4::constants::{BATTERY_READ_RETRIES, BATTERY_RETRY_BACKOFF_MS, INPUT_REPORT_SIZE};
use crate::ds4::error::Ds4Error;
use crate::ds4::types::{BatteryStatus, ControllerState, DeviceIdentity, OutputCommand};
use crate::transport::{HidEndpoint, Transport, TransportHandle};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub identity: DeviceIdentity,

    /// Battery query attempts
    pub battery_retries: u32,

    /// Pause between battery query attempts
    pub battery_backoff: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            identity: DeviceIdentity::default(),
            battery_retries: BATTERY_READ_RETRIES,
            battery_backoff: Duration::from_millis(BATTERY_RETRY_BACKOFF_MS),
        }
    }
}

/// Result of a successful connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedDevice {
    pub endpoint: HidEndpoint,

    /// Battery read right after opening, if the controller answered in time
    pub battery: Option<BatteryStatus>,
}

/// Result of a single non-blocking read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    State(ControllerState),
    /// Nothing new since the last read
    NoData,
}

/// One controller connection over a transport
pub struct DeviceSession<T: Transport> {
    transport: T,
    settings: SessionSettings,
    state: SessionState,

    // Present exactly while Connected
    handle: Option<T::Handle>,
    endpoint: Option<HidEndpoint>,
}

impl<T: Transport> DeviceSession<T> {
    pub fn new(transport: T, settings: SessionSettings) -> Self {
        Self {
            transport,
            settings,
            state: SessionState::Disconnected,
            handle: None,
            endpoint: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Endpoint of the open connection
    pub fn endpoint(&self) -> Option<&HidEndpoint> {
        self.endpoint.as_ref()
    }

    /// Find the first matching endpoint and open it non-blocking
    ///
    /// Already connected sessions return the current endpoint untouched.
    pub fn connect(&mut self) -> Result<ConnectedDevice, Ds4Error> {
        if let (SessionState::Connected, Some(endpoint)) = (self.state, &self.endpoint) {
            debug!("Already connected to {}", endpoint.path);
            return Ok(ConnectedDevice {
                endpoint: endpoint.clone(),
                battery: None,
            });
        }

        self.state = SessionState::Connecting;
        info!("Connecting to DualShock 4...");

        match self.open_first_match() {
            Ok((endpoint, handle)) => {
                self.handle = Some(handle);
                self.endpoint = Some(endpoint.clone());
                self.state = SessionState::Connected;
                info!(
                    "✓ Connected: VID={:04x}, PID={:04x}, path={}",
                    endpoint.vendor_id, endpoint.product_id, endpoint.path
                );

                info!("Checking battery status...");
                let battery = match self.get_battery_level() {
                    Ok(battery) => Some(battery),
                    Err(e) => {
                        warn!("{}", e);
                        None
                    }
                };

                Ok(ConnectedDevice { endpoint, battery })
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    fn open_first_match(&mut self) -> Result<(HidEndpoint, T::Handle), Ds4Error> {
        let endpoints = self.transport.enumerate()?;

        debug!("Found {} HID endpoints:", endpoints.len());
        for endpoint in &endpoints {
            debug!(
                "  VID: {:04x}, PID: {:04x}, Path: {}",
                endpoint.vendor_id, endpoint.product_id, endpoint.path
            );
        }

        let identity = &self.settings.identity;
        let endpoint = endpoints
            .into_iter()
            .find(|e| identity.matches(e.vendor_id, e.product_id, &e.path))
            .ok_or(Ds4Error::DeviceNotFound)?;

        let mut handle = self.transport.open(&endpoint.path)?;
        if let Err(e) = handle.set_nonblocking() {
            handle.close();
            return Err(e.into());
        }

        Ok((endpoint, handle))
    }

    /// Stop the motors and release the handle. No-op when disconnected.
    pub fn disconnect(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            self.state = SessionState::Disconnected;
            return;
        };

        info!("Disconnecting from DualShock 4...");
        if let Err(e) = handle.write(&codec::encode(OutputCommand::stop())) {
            debug!("Stop report before disconnect failed: {}", e);
        }
        handle.close();

        self.endpoint = None;
        self.state = SessionState::Disconnected;
        info!("✓ Disconnected");
    }

    /// Drop the handle after a transport failure
    fn fail_closed(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
        self.endpoint = None;
        self.state = SessionState::Disconnected;
    }

    /// Encode and write one command
    pub fn send(&mut self, command: OutputCommand) -> Result<(), Ds4Error> {
        let handle = self.handle.as_mut().ok_or(Ds4Error::NotConnected)?;
        let report = codec::encode(command);

        debug!("Sending output report: {:02X?}", report);
        match handle.write(&report) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Output report failed, closing session: {}", e);
                self.fail_closed();
                Err(e.into())
            }
        }
    }

    /// Read and decode at most one pending report
    pub fn read_state(&mut self) -> Result<ReadOutcome, Ds4Error> {
        let handle = self.handle.as_mut().ok_or(Ds4Error::NotConnected)?;
        let mut buf = [0u8; INPUT_REPORT_SIZE];

        match handle.read(&mut buf) {
            Ok(0) => Ok(ReadOutcome::NoData),
            Ok(len) => Ok(ReadOutcome::State(codec::decode(&buf[..len])?)),
            Err(e) => {
                warn!("Input report read failed, closing session: {}", e);
                self.fail_closed();
                Err(e.into())
            }
        }
    }

    /// Query the battery, retrying a bounded number of times while the
    /// controller has nothing (or only short reports) to offer
    ///
    /// The backoff between attempts sleeps the calling thread. On the device
    /// thread that holds up poll ticks and vibration steps for at most
    /// `(battery_retries - 1) * battery_backoff`.
    pub fn get_battery_level(&mut self) -> Result<BatteryStatus, Ds4Error> {
        let attempts = self.settings.battery_retries;
        let backoff = self.settings.battery_backoff;
        let handle = self.handle.as_mut().ok_or(Ds4Error::NotConnected)?;
        let mut buf = [0u8; INPUT_REPORT_SIZE];

        for attempt in 1..=attempts {
            match handle.read(&mut buf) {
                Ok(0) => debug!("Battery read {}/{}: no data", attempt, attempts),
                Ok(len) => match codec::decode(&buf[..len]) {
                    Ok(ControllerState {
                        battery: Some(battery),
                        ..
                    }) => {
                        info!(
                            "Battery: {}%{}",
                            battery.percent,
                            if battery.charging { " (charging)" } else { "" }
                        );
                        return Ok(battery);
                    }
                    Ok(_) => debug!("Battery read {}/{}: no status byte", attempt, attempts),
                    Err(e) => debug!("Battery read {}/{}: {}", attempt, attempts, e),
                },
                Err(e) => debug!("Battery read {}/{} failed: {}", attempt, attempts, e),
            }

            if attempt < attempts {
                thread::sleep(backoff);
            }
        }

        Err(Ds4Error::BatteryUnavailable { attempts })
    }
}

impl<T: Transport> Drop for DeviceSession<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{neutral_input_report, MockTransport};

    fn fast_settings() -> SessionSettings {
        SessionSettings {
            battery_backoff: Duration::ZERO,
            ..SessionSettings::default()
        }
    }

    #[test]
    fn test_invariant_handle_iff_connected() {
        let transport = MockTransport::with_ds4("mock-0");
        let mut session = DeviceSession::new(transport, fast_settings());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.endpoint().is_none());

        session.connect().unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        assert!(session.handle.is_some());

        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.handle.is_none());
    }

    #[test]
    fn test_failed_connect_returns_to_disconnected() {
        let transport = MockTransport::new();
        let mut session = DeviceSession::new(transport, fast_settings());

        assert!(matches!(session.connect(), Err(Ds4Error::DeviceNotFound)));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.handle.is_none());
    }

    #[test]
    fn test_battery_reads_short_reports_then_succeeds() {
        let transport = MockTransport::with_ds4("mock-0");
        let mut session = DeviceSession::new(transport.clone(), fast_settings());
        session.connect().unwrap();

        let mut report = neutral_input_report();
        report[30] = 0x07;
        transport.push_report(vec![0x01; 10]);
        transport.push_no_data();
        transport.push_report(report);

        let battery = session.get_battery_level().unwrap();
        assert_eq!(battery.percent, 70);
        assert!(!battery.charging);
        assert_eq!(transport.pending_reads(), 0);
    }
}
