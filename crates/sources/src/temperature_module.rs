//! Temperature module: one sensor bound to one poller and one cache

use crate::digispark::ReadError;
use crate::ModuleError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use temper_sens_core::{
    RepeatedTimer, SensorModule, SensorResultCache, StopToken, STALE_AFTER_FAILURES,
};
use temper_sens_types::{Reading, SensorValue};

/// A blocking sensor read, run on the polling thread
///
/// Implementations own their device. They must check `stop` between
/// blocking steps and return `ReadError::Cancelled` once it is set.
pub trait SensorReader: Send + 'static {
    fn read(&mut self, stop: &StopToken) -> Result<Reading, ReadError>;
}

/// Polls a `SensorReader` in the background and serves the latest reading
///
/// The reader (and therefore the device it owns) lives on the polling
/// thread and is dropped when that thread exits, so it is released exactly
/// once, after the last transfer.
pub struct TemperatureModule {
    name: String,
    cache: Arc<SensorResultCache<Reading>>,
    timer: Option<RepeatedTimer<Reading>>,
    failures: Arc<AtomicU32>,
    logfile: Option<PathBuf>,
}

impl TemperatureModule {
    /// Start polling `reader` every `interval`
    pub fn start<R: SensorReader>(
        name: impl Into<String>,
        interval: Duration,
        mut reader: R,
        logfile: Option<PathBuf>,
    ) -> Result<Self, ModuleError> {
        let name = name.into();
        let cache = Arc::new(SensorResultCache::new());
        let failures = Arc::new(AtomicU32::new(0));

        let task = {
            let cache = Arc::clone(&cache);
            let failures = Arc::clone(&failures);
            let name = name.clone();
            move |stop: &StopToken| -> Result<Reading, ReadError> {
                match reader.read(stop) {
                    Ok(reading) => {
                        failures.store(0, Ordering::SeqCst);
                        cache.publish(reading);
                        Ok(reading)
                    }
                    Err(ReadError::Cancelled) => Err(ReadError::Cancelled),
                    Err(e) => {
                        let streak = failures.fetch_add(1, Ordering::SeqCst) + 1;
                        if streak == STALE_AFTER_FAILURES {
                            log::warn!(
                                "{}: {} consecutive failed reads, keeping last reading",
                                name,
                                streak
                            );
                        }
                        cache.record_error(e.to_string());
                        Err(e)
                    }
                }
            }
        };

        let timer = RepeatedTimer::start(name.clone(), interval, task)?;
        log::info!("{}: sensor thread started", name);

        Ok(Self {
            name,
            cache,
            timer: Some(timer),
            failures,
            logfile,
        })
    }

    /// Polling cadence
    pub fn interval(&self) -> Option<Duration> {
        self.timer.as_ref().map(|t| t.interval())
    }

    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| t.is_running())
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// True once enough reads in a row have failed that the cached value
    /// should be treated as old
    pub fn is_stale(&self) -> bool {
        self.consecutive_failures() >= STALE_AFTER_FAILURES
    }
}

impl SensorModule for TemperatureModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_sensor_value(&self) -> SensorValue {
        match self.cache.read() {
            (Some(reading), changed) => SensorValue::from_reading(&reading, changed),
            (None, _) => SensorValue::no_data(),
        }
    }

    fn latest_reading(&self) -> Option<Reading> {
        self.cache.peek()
    }

    fn last_error(&self) -> Option<String> {
        self.cache.last_error()
    }

    fn logfile(&self) -> Option<&Path> {
        self.logfile.as_deref()
    }

    fn quit(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
            log::info!("{}: sensor thread stopped", self.name);
        }
    }
}

impl Drop for TemperatureModule {
    fn drop(&mut self) {
        self.quit();
    }
}
