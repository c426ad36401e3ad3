//! DigisparkTemper (USB temperature/humidity sensor) configuration types.

use crate::reading::CalibrationOffset;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while validating a sensor configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required parameter '{0}'")]
    Missing(&'static str),
    #[error("invalid value for '{name}': {value}")]
    Invalid { name: &'static str, value: String },
}

fn default_vendor_id() -> u16 {
    0x16c0
}

fn default_product_id() -> u16 {
    0x05df
}

fn default_update_interval() -> u64 {
    20_000
}

fn default_transfer_timeout() -> u64 {
    1000
}

/// Configuration for the DigisparkTemper source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigisparkConfig {
    /// Calibration offset in °C. Accepts a number or a numeric string;
    /// kept raw so a malformed value is reported at construction.
    #[serde(default)]
    pub correction_value: Option<Value>,
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "default_product_id")]
    pub product_id: u16,
    #[serde(default = "default_update_interval")]
    pub update_interval_ms: u64,
    /// libusb timeout for a single control transfer
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_ms: u64,
    /// Optional CSV log of changed readings
    #[serde(default)]
    pub logfile: Option<PathBuf>,
}

impl Default for DigisparkConfig {
    fn default() -> Self {
        Self {
            correction_value: None,
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            update_interval_ms: default_update_interval(),
            transfer_timeout_ms: default_transfer_timeout(),
            logfile: None,
        }
    }
}

impl DigisparkConfig {
    /// Parse a config from the raw JSON of a module entry
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::Invalid {
            name: "config",
            value: e.to_string(),
        })
    }

    /// Validate and return the calibration offset
    pub fn calibration(&self) -> Result<CalibrationOffset, ConfigError> {
        let raw = self
            .correction_value
            .as_ref()
            .ok_or(ConfigError::Missing("correction_value"))?;

        let parsed = match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match parsed {
            Some(v) if v.is_finite() => Ok(CalibrationOffset(v)),
            _ => Err(ConfigError::Invalid {
                name: "correction_value",
                value: raw.to_string(),
            }),
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Per-transfer timeout. Never zero, which libusb treats as unlimited.
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms.max(1))
    }
}
