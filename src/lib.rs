//! temper-sens: background polling of USB temperature/humidity sensors
//!
//! This library provides the application layer on top of the workspace
//! crates:
//! - Configuration loading and saving
//! - The render-side loop over active sensor modules
//! - The CSV log of changed readings

pub mod config;
pub mod csv_log;
pub mod dashboard;

// Re-export commonly used types
pub use config::AppConfig;
pub use dashboard::{Dashboard, DisplayLine};
pub use temper_sens_core::{SensorModule, SensorResultCache};
