//! Line-oriented JSON decoder over single-byte HID reads
//!
//! The device streams a text record terminated by `\r`, one byte per
//! feature-report transfer:
//!
//! ```text
//! {"Temperature": 23.4, "Humidity": 55}\r
//! ```
//!
//! Transfers that fail or return nothing are retried until a byte arrives or
//! the stop token is set.

use super::transport::{HidTransport, TransportError};
use crate::temperature_module::SensorReader;
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::time::Duration;
use temper_sens_core::StopToken;
use temper_sens_types::{CalibrationOffset, Reading};

/// Terminates each record
pub const LINE_TERMINATOR: u8 = b'\r';

/// Longest record accepted before giving up on the line
pub const MAX_LINE_LEN: usize = 256;

/// Consecutive failed transfers before the device is reported unresponsive
pub const UNRESPONSIVE_STREAK: u32 = 100;

/// Pause between retries once the device is unresponsive
pub const UNRESPONSIVE_BACKOFF: Duration = Duration::from_millis(100);

/// A line that could not be turned into a reading
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid sensor record {line:?}: {source}")]
    Record {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no line terminator within {max} bytes")]
    LineTooLong { max: usize },
}

/// Outcome of a failed `read`
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// Stop was requested before a full line arrived
    #[error("read cancelled")]
    Cancelled,
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Deserialize)]
struct SensorRecord {
    #[serde(rename = "Temperature")]
    temperature: f64,
    #[serde(rename = "Humidity")]
    humidity: f64,
}

/// Decode one record line into a calibrated reading
pub fn decode_line(
    line: &str,
    calibration: CalibrationOffset,
    captured_at: DateTime<Local>,
) -> Result<Reading, DecodeError> {
    let record = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(line)
        .and_then(|object| serde_json::from_value::<SensorRecord>(serde_json::Value::Object(object)))
        .map_err(|source| DecodeError::Record {
            line: line.to_string(),
            source,
        })?;

    Ok(Reading::new(
        calibration.apply(record.temperature),
        record.humidity,
        captured_at,
    ))
}

/// Reads records from a `HidTransport` and decodes them
pub struct ByteStreamDecoder<H> {
    transport: H,
    calibration: CalibrationOffset,
    /// Consecutive transfers that produced no byte
    failed_transfers: u32,
}

impl<H: HidTransport> ByteStreamDecoder<H> {
    pub fn new(transport: H, calibration: CalibrationOffset) -> Self {
        Self {
            transport,
            calibration,
            failed_transfers: 0,
        }
    }

    pub fn calibration(&self) -> CalibrationOffset {
        self.calibration
    }

    /// Read and decode the next record
    ///
    /// Decode failures are logged here, including the raw line.
    pub fn read(&mut self, stop: &StopToken) -> Result<Reading, ReadError> {
        let line = self.read_line(stop)?;
        let line = line.trim();

        match decode_line(line, self.calibration, Local::now()) {
            Ok(reading) => {
                log::info!(
                    "ByteStreamDecoder: Celsius: {} Humidity: {}",
                    reading.temperature_celsius,
                    reading.humidity_percent
                );
                Ok(reading)
            }
            Err(e) => {
                if !line.is_empty() {
                    log::error!("ByteStreamDecoder: {}", line);
                }
                log::error!("ByteStreamDecoder: {}", e);
                Err(e.into())
            }
        }
    }

    /// Accumulate bytes up to (not including) the terminator
    pub fn read_line(&mut self, stop: &StopToken) -> Result<String, ReadError> {
        let mut line = String::new();
        loop {
            let byte = self.read_byte(stop)?;
            if byte == LINE_TERMINATOR {
                return Ok(line);
            }
            if line.len() >= MAX_LINE_LEN {
                log::error!("ByteStreamDecoder: discarding {} bytes: {}", line.len(), line);
                self.skip_to_terminator(stop)?;
                return Err(DecodeError::LineTooLong { max: MAX_LINE_LEN }.into());
            }
            line.push(char::from(byte));
        }
    }

    /// Drop the rest of an oversized record so the next read starts on a
    /// record boundary
    fn skip_to_terminator(&mut self, stop: &StopToken) -> Result<(), ReadError> {
        let mut skipped = 0usize;
        while self.read_byte(stop)? != LINE_TERMINATOR {
            skipped += 1;
        }
        log::debug!("ByteStreamDecoder: skipped {} more bytes to end of record", skipped);
        Ok(())
    }

    fn read_byte(&mut self, stop: &StopToken) -> Result<u8, ReadError> {
        loop {
            if stop.is_stopped() {
                return Err(ReadError::Cancelled);
            }

            match self.transport.get_report_byte() {
                Ok(Some(byte)) => {
                    if self.failed_transfers >= UNRESPONSIVE_STREAK {
                        log::info!(
                            "ByteStreamDecoder: device responding again after {} failed transfers",
                            self.failed_transfers
                        );
                    }
                    self.failed_transfers = 0;
                    return Ok(byte);
                }
                Ok(None) => self.note_failure(None),
                Err(e) => self.note_failure(Some(&e)),
            }

            if self.failed_transfers >= UNRESPONSIVE_STREAK && stop.wait_timeout(UNRESPONSIVE_BACKOFF) {
                return Err(ReadError::Cancelled);
            }
        }
    }

    fn note_failure(&mut self, error: Option<&TransportError>) {
        self.failed_transfers = self.failed_transfers.saturating_add(1);

        if self.failed_transfers == 1 {
            match error {
                Some(e) => log::debug!("ByteStreamDecoder: transfer failed, retrying: {}", e),
                None => log::trace!("ByteStreamDecoder: empty response, retrying"),
            }
        } else if self.failed_transfers == UNRESPONSIVE_STREAK {
            log::error!(
                "ByteStreamDecoder: device unresponsive after {} attempts (last: {}), backing off",
                self.failed_transfers,
                error.map_or_else(|| "empty response".to_string(), |e| e.to_string())
            );
        }
    }
}

impl<H: HidTransport + 'static> SensorReader for ByteStreamDecoder<H> {
    fn read(&mut self, stop: &StopToken) -> Result<Reading, ReadError> {
        ByteStreamDecoder::read(self, stop)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use temper_sens_core::stop_pair;

    /// One scripted transfer outcome
    #[derive(Debug, Clone)]
    pub(crate) enum Step {
        Byte(u8),
        Empty,
        Fail(TransportError),
    }

    /// Transport that replays a script, then repeats `repeat` forever
    pub(crate) struct ScriptedTransport {
        script: VecDeque<Step>,
        repeat: Vec<Step>,
        position: usize,
        pub(crate) transfers: Arc<AtomicUsize>,
        pub(crate) released: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(script: Vec<Step>, repeat: Vec<Step>) -> Self {
            Self {
                script: script.into(),
                repeat,
                position: 0,
                transfers: Arc::new(AtomicUsize::new(0)),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Repeats `line` followed by `\r` forever
        pub(crate) fn repeating_line(line: &str) -> Self {
            Self::new(Vec::new(), line_steps(line))
        }
    }

    pub(crate) fn line_steps(line: &str) -> Vec<Step> {
        line.bytes()
            .chain(std::iter::once(LINE_TERMINATOR))
            .map(Step::Byte)
            .collect()
    }

    impl HidTransport for ScriptedTransport {
        fn get_report_byte(&mut self) -> Result<Option<u8>, TransportError> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            let step = match self.script.pop_front() {
                Some(step) => step,
                None if self.repeat.is_empty() => Step::Fail(TransportError::Timeout),
                None => {
                    let step = self.repeat[self.position % self.repeat.len()].clone();
                    self.position += 1;
                    step
                }
            };
            match step {
                Step::Byte(b) => Ok(Some(b)),
                Step::Empty => Ok(None),
                Step::Fail(e) => Err(e),
            }
        }
    }

    impl Drop for ScriptedTransport {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn decoder(steps: Vec<Step>, calibration: f64) -> ByteStreamDecoder<ScriptedTransport> {
        ByteStreamDecoder::new(ScriptedTransport::new(steps, Vec::new()), CalibrationOffset(calibration))
    }

    #[test]
    fn test_decode_line_applies_calibration() {
        let cases = [
            (23.4, 55.0, -1.0, 22.4),
            (20.0, 40.5, 0.0, 20.0),
            (18.26, 71.0, 0.5, 18.8),
            (-3.0, 90.0, -8.0, -11.0),
        ];
        for (t, h, c, expected) in cases {
            let line = format!("{{\"Temperature\": {}, \"Humidity\": {}}}", t, h);
            let reading = decode_line(&line, CalibrationOffset(c), Local::now()).unwrap();
            assert_eq!(reading.temperature_celsius, expected, "line {}", line);
            assert_eq!(reading.humidity_percent, h);
        }
    }

    #[test]
    fn test_decode_line_rejects_malformed_records() {
        let bad = [
            "",
            "not json",
            "{\"Temperature\": 23.4",
            "{\"Humidity\": 55}",
            "{\"Temperature\": 23.4, \"Humidity\": \"wet\"}",
            "[23.4, 55]",
        ];
        for line in bad {
            let err = decode_line(line, CalibrationOffset(0.0), Local::now()).unwrap_err();
            assert!(matches!(err, DecodeError::Record { .. }), "line {:?}", line);
        }
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let line = "{\"Temperature\": 21.0, \"Humidity\": 48, \"Version\": \"1.2\"}";
        let reading = decode_line(line, CalibrationOffset(0.0), Local::now()).unwrap();
        assert_eq!(reading.temperature_celsius, 21.0);
        assert_eq!(reading.humidity_percent, 48.0);
    }

    #[test]
    fn test_read_retries_through_transport_errors() {
        let mut steps = vec![
            Step::Fail(TransportError::Transfer("pipe".into())),
            Step::Empty,
            Step::Fail(TransportError::Timeout),
        ];
        for (i, step) in line_steps("{\"Temperature\": 23.4, \"Humidity\": 55}").into_iter().enumerate() {
            steps.push(step);
            if i % 5 == 0 {
                steps.push(Step::Empty);
            }
        }

        let mut decoder = decoder(steps, -1.0);
        let reading = decoder.read(&StopToken::detached()).unwrap();
        assert_eq!(reading.temperature_celsius, 22.4);
        assert_eq!(reading.humidity_percent, 55.0);
        assert_eq!(decoder.failed_transfers, 0);
    }

    #[test]
    fn test_read_trims_whitespace_around_record() {
        let mut decoder = decoder(line_steps("\n {\"Temperature\": 20, \"Humidity\": 30} "), 0.0);
        let reading = decoder.read(&StopToken::detached()).unwrap();
        assert_eq!(reading.temperature_celsius, 20.0);
    }

    #[test]
    fn test_malformed_line_is_decode_error() {
        let mut decoder = decoder(line_steps("{\"Temperature\": oops}"), 0.0);
        let err = decoder.read(&StopToken::detached()).unwrap_err();
        assert!(matches!(err, ReadError::Decode(DecodeError::Record { .. })));
    }

    #[test]
    fn test_overlong_line_is_rejected() {
        let mut steps = vec![Step::Byte(b'x'); MAX_LINE_LEN + 10];
        steps.extend(line_steps("{\"Temperature\": 20, \"Humidity\": 30}"));
        let mut decoder = decoder(steps, 0.0);

        let err = decoder.read_line(&StopToken::detached()).unwrap_err();
        assert!(matches!(err, ReadError::Decode(DecodeError::LineTooLong { max: MAX_LINE_LEN })));

        // The tail of the oversized record was consumed with it
        let reading = decoder.read(&StopToken::detached()).unwrap();
        assert_eq!(reading.temperature_celsius, 20.0);
        assert_eq!(reading.humidity_percent, 30.0);
    }

    #[test]
    fn test_stop_while_skipping_overlong_line() {
        let steps = vec![Step::Byte(b'x'); MAX_LINE_LEN + 10];
        let mut decoder = decoder(steps, 0.0);
        let (mut handle, token) = stop_pair();

        let worker = std::thread::spawn(move || decoder.read_line(&token));
        std::thread::sleep(Duration::from_millis(50));
        handle.stop();

        let result = worker.join().unwrap();
        assert!(matches!(result, Err(ReadError::Cancelled)));
    }

    #[test]
    fn test_stop_cancels_retry_loop() {
        // No script and no repeat: every transfer times out
        let mut decoder = decoder(Vec::new(), 0.0);
        let (mut handle, token) = stop_pair();
        handle.stop();

        let err = decoder.read(&token).unwrap_err();
        assert!(matches!(err, ReadError::Cancelled));
    }

    #[test]
    fn test_unresponsive_device_backs_off_until_stopped() {
        let transport = ScriptedTransport::new(Vec::new(), Vec::new());
        let transfers = Arc::clone(&transport.transfers);
        let mut decoder = ByteStreamDecoder::new(transport, CalibrationOffset(0.0));
        let (mut handle, token) = stop_pair();

        let worker = std::thread::spawn(move || decoder.read(&token));

        let start = std::time::Instant::now();
        while transfers.load(Ordering::SeqCst) < UNRESPONSIVE_STREAK as usize + 1 {
            assert!(start.elapsed() < Duration::from_secs(5));
            std::thread::sleep(Duration::from_millis(1));
        }
        handle.stop();

        let result = worker.join().unwrap();
        assert!(matches!(result, Err(ReadError::Cancelled)));
        // Backoff keeps the retry rate far below a busy loop
        assert!(transfers.load(Ordering::SeqCst) < UNRESPONSIVE_STREAK as usize + 200);
    }
}
