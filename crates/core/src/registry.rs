//! Registry of sensor module factories

use super::BoxedSensorModule;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Function that builds a module from its raw JSON config
pub type ModuleFactory = fn(&Value) -> Result<BoxedSensorModule>;

/// Registry of module names to factories
///
/// Owned by the application rather than held in a global, so tests and
/// embedders can build their own.
pub struct Registry {
    modules: HashMap<String, ModuleFactory>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Register a module factory
    pub fn register_module(&mut self, name: &str, factory: ModuleFactory) {
        self.modules.insert(name.to_string(), factory);
    }

    /// Construct a module by name
    ///
    /// Construction is where devices are opened and configs validated, so
    /// any error here means the module must not be used.
    pub fn create_module(&self, name: &str, config: &Value) -> Result<BoxedSensorModule> {
        let factory = self
            .modules
            .get(name)
            .ok_or_else(|| anyhow!("Unknown module: {}", name))?;
        factory(config)
    }

    /// List all registered module names
    pub fn list_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
