//! Source configuration types for all sensor modules.

pub mod digispark;

// Re-export all source config types for convenience
pub use digispark::{ConfigError, DigisparkConfig};

use serde::{Deserialize, Serialize};

/// One entry of the application's module list
///
/// `config` is kept as raw JSON so each module can validate its own settings
/// at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub module: String,
    #[serde(default)]
    pub config: serde_json::Value,
}
