//! Verify the session and mock transport log through `log`

use ds4_rs::ds4::{DeviceSession, OutputCommand, SessionSettings};
use ds4_rs::transport::{list_endpoints, MockTransport};
use std::time::Duration;

#[test]
fn test_session_logs() {
    // Initialize a simple logger for testing
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();

    let transport = MockTransport::with_ds4("/dev/hidraw0");
    let settings = SessionSettings {
        battery_retries: 2,
        battery_backoff: Duration::ZERO,
        ..SessionSettings::default()
    };
    let mut session = DeviceSession::new(transport, settings);

    // Endpoint list, battery retries and output reports all log at debug
    assert!(session.connect().is_ok());
    assert!(session.send(OutputCommand::set_motors(64, 64)).is_ok());
    session.disconnect();
}

#[test]
fn test_list_endpoints_filters_vendor() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();

    let mut transport = MockTransport::new();
    transport.add_endpoint(0x054C, 0x09CC, "/dev/hidraw0");
    transport.add_endpoint(0x045E, 0x028E, "/dev/hidraw1");
    transport.add_endpoint(0x054C, 0x0CE6, "/dev/hidraw2");

    let paths: Vec<_> = list_endpoints(&mut transport, 0x054C)
        .unwrap()
        .into_iter()
        .map(|endpoint| endpoint.path)
        .collect();
    assert_eq!(paths, vec!["/dev/hidraw0", "/dev/hidraw2"]);
}
