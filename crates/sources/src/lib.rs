//! temper-sens-sources: Sensor module implementations for temper-sens.

pub mod digispark;
mod error;
mod temperature_module;

pub use digispark::{
    decode_line, ByteStreamDecoder, DecodeError, HidTransport, ReadError, TransportError,
};
pub use error::ModuleError;
pub use temperature_module::{SensorReader, TemperatureModule};

use temper_sens_core::Registry;

/// Register all built-in modules with a registry
pub fn register_all(registry: &mut Registry) {
    registry.register_module(digispark::MODULE_NAME, digispark::create_module);
}

/// A registry with every built-in module registered
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    register_all(&mut registry);
    registry
}
