//! libusb-backed transport

use super::transport::{HidTransport, TransportError, GET_REPORT_VALUE, USBRQ_HID_GET_REPORT};
use crate::ModuleError;
use rusb::{DeviceHandle, Direction, GlobalContext, Recipient, RequestType};
use std::time::Duration;

/// An open USB device answering HID feature-report reads
///
/// The device is closed when this is dropped.
pub struct UsbHidTransport {
    handle: DeviceHandle<GlobalContext>,
    request_type: u8,
    timeout: Duration,
    vendor_id: u16,
    product_id: u16,
}

impl UsbHidTransport {
    /// Open the first device matching `vendor_id:product_id`
    pub fn open(vendor_id: u16, product_id: u16, timeout: Duration) -> Result<Self, ModuleError> {
        let devices = rusb::devices().map_err(|e| ModuleError::Usb(e.to_string()))?;

        let device = devices
            .iter()
            .find(|device| {
                device
                    .device_descriptor()
                    .map(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
                    .unwrap_or(false)
            })
            .ok_or(ModuleError::DeviceNotFound {
                vendor_id,
                product_id,
            })?;

        let handle = device.open().map_err(|e| ModuleError::Usb(e.to_string()))?;
        log::info!(
            "UsbHidTransport: opened {:04x}:{:04x} (bus {} address {})",
            vendor_id,
            product_id,
            device.bus_number(),
            device.address()
        );

        Ok(Self {
            handle,
            request_type: rusb::request_type(Direction::In, RequestType::Class, Recipient::Device),
            timeout,
            vendor_id,
            product_id,
        })
    }
}

impl HidTransport for UsbHidTransport {
    fn get_report_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let mut buf = [0u8; 1];
        match self.handle.read_control(
            self.request_type,
            USBRQ_HID_GET_REPORT,
            GET_REPORT_VALUE,
            0,
            &mut buf,
            self.timeout,
        ) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(rusb::Error::Timeout) => Err(TransportError::Timeout),
            Err(rusb::Error::NoDevice) => Err(TransportError::Disconnected),
            Err(e) => Err(TransportError::Transfer(e.to_string())),
        }
    }
}

impl Drop for UsbHidTransport {
    fn drop(&mut self) {
        log::debug!(
            "UsbHidTransport: releasing {:04x}:{:04x}",
            self.vendor_id,
            self.product_id
        );
    }
}
