//! Sensor module trait

use std::path::Path;
use temper_sens_types::{Reading, SensorValue};

/// A sensor bound to a background poller
///
/// Modules are responsible for owning their device and polling worker, and
/// for handing the latest value to the rendering layer without blocking.
pub trait SensorModule: Send {
    /// Module name, used in log messages
    fn name(&self) -> &str;

    /// Latest value and whether it changed since the previous call
    ///
    /// Never blocks on sensor I/O. Returns `SensorValue::no_data()` until the
    /// first reading arrives.
    fn get_sensor_value(&self) -> SensorValue;

    /// Latest reading without affecting change detection
    fn latest_reading(&self) -> Option<Reading>;

    /// Error from the most recent failed poll, if the last poll failed
    fn last_error(&self) -> Option<String> {
        None
    }

    /// CSV file the application should append changed readings to
    fn logfile(&self) -> Option<&Path> {
        None
    }

    /// Stop polling and release the device. Idempotent.
    fn quit(&mut self);
}

/// Type-erased module for dynamic dispatch
pub type BoxedSensorModule = Box<dyn SensorModule>;
