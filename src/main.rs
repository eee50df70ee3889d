//! DualShock 4 Driver - Main Application
//!
//! Small command-line front end for the driver:
//!
//! - `ds4-rs list` prints every HID endpoint from the configured vendor
//! - `ds4-rs monitor [pattern]` connects, optionally plays a vibration
//!   pattern, and prints every event as a JSON line until the controller
//!   disconnects

use anyhow::{bail, Context, Result};
use ds4_rs::transport::{list_endpoints, HidApiTransport};
use ds4_rs::{Config, Ds4Event, Ds4Manager, VibrationPattern};
use std::path::Path;

const CONFIG_PATH: &str = "configs/default.toml";

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = if Path::new(CONFIG_PATH).exists() {
        Config::load_default().context("loading configuration")?
    } else {
        Config::default()
    };

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("list") => list(&config),
        Some("monitor") | None => {
            let pattern = args
                .next()
                .map(|name| name.parse::<VibrationPattern>())
                .transpose()?;
            monitor(config, pattern)
        }
        Some(other) => bail!("unknown command '{}', expected 'list' or 'monitor'", other),
    }
}

fn list(config: &Config) -> Result<()> {
    let mut transport = HidApiTransport::new();
    let endpoints = list_endpoints(&mut transport, config.device.vendor_id)
        .context("enumerating HID devices")?;

    if endpoints.is_empty() {
        println!("No devices from vendor 0x{:04X}", config.device.vendor_id);
    }
    for endpoint in endpoints {
        let supported = config.device.product_ids.contains(&endpoint.product_id);
        println!(
            "VID: {:04x}, PID: {:04x}, Path: {}{}",
            endpoint.vendor_id,
            endpoint.product_id,
            endpoint.path,
            if supported { " (DualShock 4)" } else { "" }
        );
    }
    Ok(())
}

fn monitor(config: Config, pattern: Option<VibrationPattern>) -> Result<()> {
    let mut manager = Ds4Manager::new(config, HidApiTransport::new());
    manager.start().context("starting device thread")?;

    let connected = manager.connect().context(
        "controller not found; make sure it is paired over Bluetooth or plugged in over USB",
    )?;
    if let Some(battery) = connected.battery {
        println!(
            "Connected: {} (battery {}%{})",
            connected.endpoint.path,
            battery.percent,
            if battery.charging { ", charging" } else { "" }
        );
    } else {
        println!("Connected: {}", connected.endpoint.path);
    }

    if let Some(pattern) = pattern {
        manager.run_pattern(pattern)?;
    }

    for event in manager.events().iter() {
        println!("{}", serde_json::to_string(&event)?);
        if matches!(event, Ds4Event::Disconnected { .. }) {
            break;
        }
    }

    manager.stop();
    Ok(())
}
