//! Sensor readings and calibration

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A single temperature + humidity sample
///
/// Readings are immutable once constructed; a new one is produced on every
/// successful poll and replaces the previous one in the cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Calibrated temperature in degrees Celsius, rounded to 0.1
    pub temperature_celsius: f64,
    /// Relative humidity (0.0 to 100.0)
    pub humidity_percent: f64,
    /// When the sample was decoded
    pub captured_at: DateTime<Local>,
}

impl Reading {
    pub fn new(temperature_celsius: f64, humidity_percent: f64, captured_at: DateTime<Local>) -> Self {
        Self {
            temperature_celsius,
            humidity_percent,
            captured_at,
        }
    }

    /// True if both measured values match, ignoring capture time
    pub fn same_values(&self, other: &Reading) -> bool {
        self.temperature_celsius == other.temperature_celsius
            && self.humidity_percent == other.humidity_percent
    }
}

/// Additive correction applied to the raw sensor temperature
///
/// Fixed for the lifetime of a device binding.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationOffset(pub f64);

impl CalibrationOffset {
    /// Apply the offset and round to one decimal place
    pub fn apply(&self, raw_celsius: f64) -> f64 {
        round_tenths(raw_celsius + self.0)
    }
}

/// Round the exact binary value to one decimal, ties to even
fn round_tenths(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// Value handed to the rendering layer by `get_sensor_value()`
///
/// `temperature` and `humidity` are `None` until the first reading arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorValue {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    /// Capture time of the reading the values came from
    pub captured_at: Option<DateTime<Local>>,
    /// Whether the reading differs from the one returned by the previous call
    pub changed: bool,
}

impl SensorValue {
    /// The "no data yet" indicator
    pub fn no_data() -> Self {
        Self::default()
    }

    pub fn from_reading(reading: &Reading, changed: bool) -> Self {
        Self {
            temperature: Some(reading.temperature_celsius),
            humidity: Some(reading.humidity_percent),
            captured_at: Some(reading.captured_at),
            changed,
        }
    }

    pub fn has_data(&self) -> bool {
        self.temperature.is_some() && self.humidity.is_some()
    }

    /// `(temperature, humidity, changed)`
    pub fn into_tuple(self) -> (Option<f64>, Option<f64>, bool) {
        self.into()
    }
}

impl From<SensorValue> for (Option<f64>, Option<f64>, bool) {
    fn from(value: SensorValue) -> Self {
        (value.temperature, value.humidity, value.changed)
    }
}
