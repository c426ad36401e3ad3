//! DigisparkTemper (USB temperature/humidity sensor) module
//!
//! The DigisparkTemper firmware answers HID feature-report requests with one
//! byte of a JSON text record at a time. This module opens the device by its
//! USB vendor/product id, validates the calibration offset and starts a
//! background poller.
//!
//! Example config:
//!
//! ```json
//! {
//!   "module": "DigisparkTemper",
//!   "config": {
//!     "correction_value": -1,
//!     "update_interval_ms": 20000,
//!     "logfile": "/var/log/sensor.csv"
//!   }
//! }
//! ```

mod decoder;
mod transport;
#[cfg(feature = "usb")]
mod usb;

pub use decoder::{
    decode_line, ByteStreamDecoder, DecodeError, ReadError, LINE_TERMINATOR, MAX_LINE_LEN,
    UNRESPONSIVE_BACKOFF, UNRESPONSIVE_STREAK,
};
pub use transport::{
    HidTransport, TransportError, GET_REPORT_VALUE, HID_REPORT_TYPE_FEATURE, USBRQ_HID_GET_REPORT,
};
#[cfg(feature = "usb")]
pub use usb::UsbHidTransport;

use crate::{ModuleError, TemperatureModule};
use serde_json::Value;
use temper_sens_core::BoxedSensorModule;
use temper_sens_types::DigisparkConfig;

/// Name used in config files
pub const MODULE_NAME: &str = "DigisparkTemper";

/// Build a module from a config and a transport opener
///
/// The calibration offset is validated before `open` is called, so a bad
/// config never touches the device or starts a thread.
pub fn connect<H, F>(config: &DigisparkConfig, open: F) -> Result<TemperatureModule, ModuleError>
where
    H: HidTransport + 'static,
    F: FnOnce(&DigisparkConfig) -> Result<H, ModuleError>,
{
    let calibration = config.calibration()?;
    let transport = open(config)?;
    let decoder = ByteStreamDecoder::new(transport, calibration);

    log::info!(
        "{}: polling {:04x}:{:04x} every {:?} (correction {})",
        MODULE_NAME,
        config.vendor_id,
        config.product_id,
        config.update_interval(),
        calibration.0
    );

    TemperatureModule::start(
        MODULE_NAME,
        config.update_interval(),
        decoder,
        config.logfile.clone(),
    )
}

/// Open the physical device over libusb
#[cfg(feature = "usb")]
pub fn open(config: &DigisparkConfig) -> Result<TemperatureModule, ModuleError> {
    connect(config, |c| {
        UsbHidTransport::open(c.vendor_id, c.product_id, c.transfer_timeout())
    })
}

/// Open the physical device over libusb
#[cfg(not(feature = "usb"))]
pub fn open(config: &DigisparkConfig) -> Result<TemperatureModule, ModuleError> {
    connect(config, |_| Err::<NoTransport, _>(ModuleError::UsbUnavailable))
}

#[cfg(not(feature = "usb"))]
enum NoTransport {}

#[cfg(not(feature = "usb"))]
impl HidTransport for NoTransport {
    fn get_report_byte(&mut self) -> Result<Option<u8>, TransportError> {
        match *self {}
    }
}

/// Registry factory
pub fn create_module(value: &Value) -> anyhow::Result<BoxedSensorModule> {
    let config = DigisparkConfig::from_value(value).map_err(ModuleError::from)?;
    let module = open(&config).map_err(|e| {
        log::error!("{}: {}", MODULE_NAME, e);
        e
    })?;
    Ok(Box::new(module))
}

#[cfg(test)]
mod tests {
    use super::decoder::tests::ScriptedTransport;
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use temper_sens_core::SensorModule;

    const RECORD: &str = "{\"Temperature\": 23.4, \"Humidity\": 55}";

    fn config(correction: Value, interval_ms: u64) -> DigisparkConfig {
        DigisparkConfig::from_value(&json!({
            "correction_value": correction,
            "update_interval_ms": interval_ms,
        }))
        .unwrap()
    }

    fn wait_for(deadline: Duration, mut condition: impl FnMut() -> bool) {
        let start = Instant::now();
        while !condition() {
            assert!(start.elapsed() < deadline, "condition not met in time");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_end_to_end_poll_cycles() {
        let transport = ScriptedTransport::repeating_line(RECORD);
        let transfers = Arc::clone(&transport.transfers);
        let released = Arc::clone(&transport.released);
        let line_len = RECORD.len() + 1;

        let mut module = connect(&config(json!(-1.0), 10), |_| Ok(transport)).unwrap();

        // First poll cycle
        let mut first = module.get_sensor_value();
        wait_for(Duration::from_secs(5), || {
            if !first.has_data() {
                first = module.get_sensor_value();
            }
            first.has_data()
        });
        assert_eq!(first.into_tuple(), (Some(22.4), Some(55.0), true));

        // Wait for at least one more identical line to be decoded
        let seen = transfers.load(Ordering::SeqCst);
        wait_for(Duration::from_secs(5), || {
            transfers.load(Ordering::SeqCst) >= seen + 2 * line_len
        });
        let second = module.get_sensor_value();
        assert_eq!(second.into_tuple(), (Some(22.4), Some(55.0), false));

        module.quit();
        assert_eq!(released.load(Ordering::SeqCst), 1);
        module.quit();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_numeric_calibration_fails_before_open() {
        let opened = AtomicUsize::new(0);
        let result = connect(&config(json!("n/a"), 10), |_| {
            opened.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptedTransport::repeating_line(RECORD))
        });

        assert!(matches!(result, Err(ModuleError::Config(_))));
        assert_eq!(opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_device_is_construction_error() {
        let result = connect(&config(json!(0), 10), |c| {
            Err::<ScriptedTransport, _>(ModuleError::DeviceNotFound {
                vendor_id: c.vendor_id,
                product_id: c.product_id,
            })
        });

        let err = result.err().unwrap();
        assert_eq!(err.to_string(), "device 16c0:05df not found");
    }

    #[test]
    fn test_factory_rejects_bad_config() {
        let err = create_module(&json!({ "correction_value": "n/a" })).err().unwrap();
        assert!(err.to_string().contains("correction_value"));

        let err = create_module(&json!({ "update_interval_ms": "soon" })).err().unwrap();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_logfile_passed_through() {
        let config = DigisparkConfig::from_value(&json!({
            "correction_value": 0,
            "update_interval_ms": 1000,
            "logfile": "/var/log/sensor.csv",
        }))
        .unwrap();
        let mut module = connect(&config, |_| Ok(ScriptedTransport::repeating_line(RECORD))).unwrap();
        assert_eq!(
            module.logfile().map(|p| p.to_string_lossy().into_owned()),
            Some("/var/log/sensor.csv".to_string())
        );
        assert_eq!(module.interval(), Some(Duration::from_secs(1)));
        module.quit();
    }
}
