//! Configuration loader and validator
//!
//! Loads driver configuration from TOML files in the configs/ directory.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::ds4::constants::{
    BATTERY_READ_RETRIES, BATTERY_RETRY_BACKOFF_MS, DS4_PRODUCT_IDS, POLL_INTERVAL_MS,
    SONY_VENDOR_ID,
};
use crate::ds4::session::SessionSettings;
use crate::ds4::types::DeviceIdentity;
use crate::worker::WorkerSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub polling: PollingSettings,

    #[serde(default)]
    pub battery: BatterySettings,

    #[serde(default)]
    pub vibration: VibrationSettings,
}

/// Which controller to open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    #[serde(default = "default_product_ids")]
    pub product_ids: Vec<u16>,

    /// Only open this HID path
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_ids: default_product_ids(),
            path: None,
        }
    }
}

/// Input polling loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Time between reads (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Consecutive undecodable reports tolerated before giving up on the device
    #[serde(default = "default_max_decode_failures")]
    pub max_decode_failures: u32,

    /// Events buffered for a slow consumer before new ones are dropped
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_decode_failures: default_max_decode_failures(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Battery query retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterySettings {
    #[serde(default = "default_battery_retries")]
    pub retries: u32,

    #[serde(default = "default_battery_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for BatterySettings {
    fn default() -> Self {
        Self {
            retries: default_battery_retries(),
            backoff_ms: default_battery_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibrationSettings {
    /// Enable vibration/rumble
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Short rumble right after connecting
    #[serde(default)]
    pub connect_feedback: bool,
}

impl Default for VibrationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_feedback: false,
        }
    }
}

fn default_vendor_id() -> u16 { SONY_VENDOR_ID }
fn default_product_ids() -> Vec<u16> { DS4_PRODUCT_IDS.to_vec() }
fn default_poll_interval_ms() -> u64 { POLL_INTERVAL_MS }
fn default_max_decode_failures() -> u32 { 10 }
fn default_event_capacity() -> usize { 100 }
fn default_battery_retries() -> u32 { BATTERY_READ_RETRIES }
fn default_battery_backoff_ms() -> u64 { BATTERY_RETRY_BACKOFF_MS }
fn default_true() -> bool { true }

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::from_toml(&content)?;

        info!("✓ Config loaded");
        Ok(config)
    }

    /// Load default configuration from configs/default.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("configs/default.toml")
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;

        debug!("  - Vendor: 0x{:04X}", config.device.vendor_id);
        debug!("  - Products: {:04X?}", config.device.product_ids);
        debug!("  - Poll interval: {} ms", config.polling.interval_ms);

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.product_ids.is_empty() {
            return Err(ConfigError::Invalid(
                "device.product_ids must list at least one product".into(),
            ));
        }

        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "polling.interval_ms must be greater than 0".into(),
            ));
        }

        if self.polling.max_decode_failures == 0 {
            return Err(ConfigError::Invalid(
                "polling.max_decode_failures must be at least 1".into(),
            ));
        }

        if self.polling.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "polling.event_capacity must be greater than 0".into(),
            ));
        }

        if self.battery.retries == 0 {
            return Err(ConfigError::Invalid(
                "battery.retries must be at least 1".into(),
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            vendor_id: self.device.vendor_id,
            product_ids: self.device.product_ids.clone(),
            path: self.device.path.clone(),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            identity: self.identity(),
            battery_retries: self.battery.retries,
            battery_backoff: Duration::from_millis(self.battery.backoff_ms),
        }
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            max_decode_failures: self.polling.max_decode_failures,
            vibration_enabled: self.vibration.enabled,
            connect_feedback: self.vibration.connect_feedback,
        }
    }
}
