//! HID "get report" transport

/// HID class request: GET_REPORT
pub const USBRQ_HID_GET_REPORT: u8 = 0x01;

/// Report type in the high byte of wValue (3 = feature report)
pub const HID_REPORT_TYPE_FEATURE: u8 = 0x03;

/// wValue for a feature report with report ID 0
pub const GET_REPORT_VALUE: u16 = (HID_REPORT_TYPE_FEATURE as u16) << 8;

/// A single failed control transfer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("transfer timed out")]
    Timeout,
    #[error("device disconnected")]
    Disconnected,
    #[error("transfer failed: {0}")]
    Transfer(String),
}

/// Source of single report bytes
///
/// Each call issues one blocking transfer of length 1. `Ok(None)` means the
/// device answered with no data; callers retry in both that case and on
/// error.
pub trait HidTransport: Send {
    fn get_report_byte(&mut self) -> Result<Option<u8>, TransportError>;
}

impl<H: HidTransport + ?Sized> HidTransport for Box<H> {
    fn get_report_byte(&mut self) -> Result<Option<u8>, TransportError> {
        (**self).get_report_byte()
    }
}
