//! Temperature units and display text

use serde::{Deserialize, Serialize};

/// Temperature unit for display
///
/// Serialized with the unit-system names used in config files
/// ("metric", "imperial").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[serde(rename = "metric")]
    #[default]
    Celsius,
    #[serde(rename = "imperial")]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius value into this unit
    pub fn from_celsius(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Format a Celsius value, e.g. "22.4°C"
    pub fn temperature_text(&self, celsius: f64) -> String {
        format!("{:.1}{}", self.from_celsius(celsius), self.symbol())
    }
}

impl std::str::FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metric" | "celsius" | "c" => Ok(TemperatureUnit::Celsius),
            "imperial" | "fahrenheit" | "f" => Ok(TemperatureUnit::Fahrenheit),
            other => Err(format!("unknown units '{}', expected metric or imperial", other)),
        }
    }
}

/// Format a relative humidity, e.g. "55%"
pub fn percentage_text(value: f64) -> String {
    format!("{:.0}%", value)
}
