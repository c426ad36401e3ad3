//! temper-sens-types: Shared data types for temper-sens.
//!
//! This crate contains pure data types (readings, calibration, units and
//! sensor configs) shared across all temper-sens crates. Nothing here touches
//! hardware or spawns threads.

pub mod reading;
pub mod source_configs;
pub mod units;

// Re-export commonly used types at the crate root for convenience
pub use reading::{CalibrationOffset, Reading, SensorValue};
pub use source_configs::{DigisparkConfig, ModuleEntry};
pub use units::TemperatureUnit;
