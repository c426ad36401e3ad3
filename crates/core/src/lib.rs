//! temper-sens-core: Core polling primitives for temper-sens.
//!
//! This crate contains the sensor-agnostic pieces: a repeating background
//! timer with cooperative cancellation, the latest-value result cache, the
//! `SensorModule` trait and the module registry.

pub mod constants;
mod registry;
mod repeated_timer;
mod result_cache;
mod sensor_module;
mod stop_token;
mod sync;

pub use constants::{DEFAULT_POLL_INTERVAL, DEFAULT_RENDER_INTERVAL, STALE_AFTER_FAILURES};
pub use registry::{ModuleFactory, Registry};
pub use repeated_timer::{RepeatedTimer, TimerError, TimerResult};
pub use result_cache::{Sample, SensorResultCache};
pub use sensor_module::{BoxedSensorModule, SensorModule};
pub use stop_token::{stop_pair, StopHandle, StopToken};

// Re-export types used in trait signatures for convenience
pub use temper_sens_types::{Reading, SensorValue};
