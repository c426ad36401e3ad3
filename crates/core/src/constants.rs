//! Shared constants for sensor polling

use std::time::Duration;

/// Polling cadence used when a sensor config does not set one (20s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// How often the application asks modules for a new value (1s)
pub const DEFAULT_RENDER_INTERVAL: Duration = Duration::from_millis(1000);

/// Consecutive failed polls after which a module reports its data as stale.
/// The cached reading is kept; this only affects logging and status.
pub const STALE_AFTER_FAILURES: u32 = 5;
