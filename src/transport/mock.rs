//! Mock transport for testing.
//!
//! Reads are scripted ahead of time and every call is recorded, so the
//! session, worker and manager can be exercised without hardware. Clones share
//! the same script and call log.

use log::{debug, info};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{HidEndpoint, Transport, TransportError, TransportHandle};
use crate::ds4::constants::{
    DPAD_FACE_OFFSET, DPAD_NEUTRAL, DS4_V2_PRODUCT_ID, INPUT_REPORT_SIZE, LEFT_STICK_X_OFFSET,
    RIGHT_STICK_Y_OFFSET, SONY_VENDOR_ID,
};

/// One scripted read result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRead {
    Report(Vec<u8>),
    NoData,
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    endpoints: Vec<HidEndpoint>,
    reads: VecDeque<MockRead>,
    writes: Vec<Vec<u8>>,
    opened: Vec<String>,
    enumerate_calls: usize,
    read_calls: usize,
    close_calls: usize,
    fail_enumerate: bool,
    fail_open: bool,
    fail_writes: usize,
}

/// Scriptable in-memory transport
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// A transport with no endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport exposing a single DualShock 4 v2 at `path`.
    pub fn with_ds4(path: &str) -> Self {
        let transport = Self::new();
        transport.add_endpoint(SONY_VENDOR_ID, DS4_V2_PRODUCT_ID, path);
        transport
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_endpoint(&self, vendor_id: u16, product_id: u16, path: &str) {
        self.lock().endpoints.push(HidEndpoint {
            vendor_id,
            product_id,
            path: path.to_string(),
            product: None,
        });
    }

    /// Queue one input report
    pub fn push_report(&self, report: Vec<u8>) {
        self.lock().reads.push_back(MockRead::Report(report));
    }

    /// Queue an empty non-blocking read
    pub fn push_no_data(&self) {
        self.lock().reads.push_back(MockRead::NoData);
    }

    /// Queue a read failure
    pub fn push_read_error(&self, reason: &str) {
        self.lock().reads.push_back(MockRead::Fail(reason.to_string()));
    }

    pub fn set_fail_enumerate(&self, fail: bool) {
        self.lock().fail_enumerate = fail;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Make the next `count` writes fail
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().fail_writes = count;
    }

    /// Every report written so far
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Paths passed to `open`, in call order
    pub fn opened_paths(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    pub fn enumerate_count(&self) -> usize {
        self.lock().enumerate_calls
    }

    pub fn read_count(&self) -> usize {
        self.lock().read_calls
    }

    pub fn close_count(&self) -> usize {
        self.lock().close_calls
    }

    /// Scripted reads not yet consumed
    pub fn pending_reads(&self) -> usize {
        self.lock().reads.len()
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn enumerate(&mut self) -> Result<Vec<HidEndpoint>, TransportError> {
        let mut state = self.lock();
        state.enumerate_calls += 1;
        if state.fail_enumerate {
            return Err(TransportError::Enumerate("mock enumeration failure".into()));
        }
        Ok(state.endpoints.clone())
    }

    fn open(&mut self, path: &str) -> Result<Self::Handle, TransportError> {
        let mut state = self.lock();
        state.opened.push(path.to_string());
        if state.fail_open {
            return Err(TransportError::Open {
                path: path.to_string(),
                reason: "mock open failure".into(),
            });
        }

        info!("[MOCK HID] Opened {}", path);
        Ok(MockHandle {
            state: Arc::clone(&self.state),
            closed: false,
        })
    }
}

/// Handle produced by [`MockTransport`]
#[derive(Debug)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TransportHandle for MockHandle {
    fn set_nonblocking(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let mut state = self.lock();
        state.read_calls += 1;
        match state.reads.pop_front() {
            Some(MockRead::Report(report)) => {
                let len = report.len().min(buf.len());
                buf[..len].copy_from_slice(&report[..len]);
                Ok(len)
            }
            Some(MockRead::Fail(reason)) => Err(TransportError::Read(reason)),
            Some(MockRead::NoData) | None => Ok(0),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let mut state = self.lock();
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(TransportError::Write("mock write failure".into()));
        }

        debug!("[MOCK HID] Write {:02X?}", data);
        state.writes.push(data.to_vec());
        Ok(data.len())
    }

    fn close(mut self) {
        self.closed = true;
        self.lock().close_calls += 1;
        info!("[MOCK HID] Closed");
    }
}

/// A 64-byte input report with centered sticks, nothing pressed and an empty
/// battery, ready to be tweaked by tests.
pub fn neutral_input_report() -> Vec<u8> {
    let mut report = vec![0u8; INPUT_REPORT_SIZE];
    report[0] = 0x01;
    report[LEFT_STICK_X_OFFSET..=RIGHT_STICK_Y_OFFSET].fill(0x80);
    report[DPAD_FACE_OFFSET] = DPAD_NEUTRAL;
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_reads_follow_script() {
        let mut transport = MockTransport::with_ds4("mock-0");
        transport.push_report(vec![1, 2, 3]);
        transport.push_read_error("gone");

        let mut handle = transport.open("mock-0").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(handle.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert!(handle.read(&mut buf).is_err());
        // Script exhausted: behaves like an idle non-blocking read
        assert_eq!(handle.read(&mut buf).unwrap(), 0);
        assert_eq!(transport.read_count(), 3);
    }

    #[test]
    fn mock_clones_share_log() {
        let mut transport = MockTransport::with_ds4("mock-0");
        let observer = transport.clone();

        let mut handle = transport.open("mock-0").unwrap();
        handle.write(&[5, 1]).unwrap();
        handle.close();

        assert_eq!(observer.writes(), vec![vec![5, 1]]);
        assert_eq!(observer.opened_paths(), vec!["mock-0".to_string()]);
        assert_eq!(observer.close_count(), 1);
    }

    #[test]
    fn mock_write_failures_are_counted_down() {
        let mut transport = MockTransport::with_ds4("mock-0");
        transport.fail_next_writes(1);

        let mut handle = transport.open("mock-0").unwrap();
        assert!(handle.write(&[1]).is_err());
        assert!(handle.write(&[2]).is_ok());
        assert_eq!(transport.writes(), vec![vec![2]]);
    }
}
