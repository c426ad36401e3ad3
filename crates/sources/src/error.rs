//! Module construction errors

use temper_sens_core::TimerError;
use temper_sens_types::source_configs::ConfigError;

/// Fatal errors raised while constructing a sensor module
///
/// A module that failed construction must not be used; the caller reports
/// the error and leaves the module out of the active set.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("device {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },
    #[error("failed to open USB device: {0}")]
    Usb(String),
    #[error("USB support is not enabled in this build")]
    UsbUnavailable,
    #[error(transparent)]
    Timer(#[from] TimerError),
}
