//! Render-side loop over active sensor modules
//!
//! Stands in for the display: each tick pulls the latest value from every
//! module, formats changed values and appends them to the module's CSV log.

use crate::config::AppConfig;
use crate::csv_log::CsvLog;
use chrono::Local;
use std::time::Duration;
use temper_sens_core::{BoxedSensorModule, Registry, StopToken};
use temper_sens_types::units::percentage_text;
use temper_sens_types::{Reading, TemperatureUnit};

struct ActiveModule {
    module: BoxedSensorModule,
    log: Option<CsvLog>,
}

/// A changed value reported by `tick()`
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayLine {
    pub module: String,
    pub text: String,
}

/// The set of modules that constructed successfully
pub struct Dashboard {
    modules: Vec<ActiveModule>,
    units: TemperatureUnit,
}

impl Dashboard {
    /// Construct every configured module
    ///
    /// Modules that fail construction are logged and left out.
    pub fn from_config(config: &AppConfig, registry: &Registry) -> Self {
        let mut modules = Vec::with_capacity(config.modules.len());
        for entry in &config.modules {
            match registry.create_module(&entry.module, &entry.config) {
                Ok(module) => modules.push(module),
                Err(e) => log::error!("{}: disabled: {:#}", entry.module, e),
            }
        }
        Self::with_modules(modules, config.units)
    }

    pub fn with_modules(modules: Vec<BoxedSensorModule>, units: TemperatureUnit) -> Self {
        let modules = modules
            .into_iter()
            .map(|module| {
                let log = module.logfile().map(CsvLog::new);
                ActiveModule { module, log }
            })
            .collect();
        Self { modules, units }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Poll every module once; returns the values that changed
    pub fn tick(&mut self) -> Vec<DisplayLine> {
        let mut lines = Vec::new();

        for active in &self.modules {
            let value = active.module.get_sensor_value();
            if !value.changed {
                continue;
            }
            let (Some(celsius), Some(humidity)) = (value.temperature, value.humidity) else {
                continue;
            };

            lines.push(DisplayLine {
                module: active.module.name().to_string(),
                text: format!(
                    "{}  {}",
                    self.units.temperature_text(celsius),
                    percentage_text(humidity)
                ),
            });

            if let Some(csv) = &active.log {
                let captured_at = value.captured_at.unwrap_or_else(Local::now);
                let reading = Reading::new(celsius, humidity, captured_at);
                if let Err(e) = csv.append(&reading) {
                    log::warn!("{}: failed to write log: {:#}", active.module.name(), e);
                }
            }
        }

        lines
    }

    /// Tick every `interval` until `ticks` have run or `stop` is set, then
    /// quit all modules. Returns the number of ticks run.
    pub fn run(
        &mut self,
        interval: Duration,
        ticks: Option<u64>,
        stop: &StopToken,
        mut emit: impl FnMut(&DisplayLine),
    ) -> u64 {
        let mut count = 0u64;
        while ticks.map_or(true, |limit| count < limit) && !stop.is_stopped() {
            for line in self.tick() {
                emit(&line);
            }
            count += 1;
            if stop.wait_timeout(interval) {
                log::info!("Dashboard: stop requested after {} ticks", count);
                break;
            }
        }
        self.quit();
        count
    }

    /// Stop every module's poller and release devices
    pub fn quit(&mut self) {
        for active in &mut self.modules {
            active.module.quit();
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.quit();
    }
}
