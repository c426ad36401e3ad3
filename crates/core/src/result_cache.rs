//! Latest-value result cache
//!
//! Decouples the polling cadence from the render cadence. The polling worker
//! publishes, the renderer reads. Only the most recent value is kept; a newer
//! value overwrites an unconsumed older one. Each `read()` reports whether
//! the value changed since the previous `read()`.

use crate::sync::lock_or_recover;
use std::sync::Mutex;
use temper_sens_types::Reading;

/// A value that can be held by `SensorResultCache`
pub trait Sample: Clone + Send {
    /// True if `other` carries the same measured content (capture time aside)
    fn same_content(&self, other: &Self) -> bool;
}

impl Sample for Reading {
    fn same_content(&self, other: &Self) -> bool {
        self.same_values(other)
    }
}

/// empty -> unconsumed -> consumed -> unconsumed ...
#[derive(Debug)]
enum CellState<T> {
    Empty,
    Unconsumed(T),
    Consumed(T),
}

#[derive(Debug)]
struct ResultCell<T> {
    state: CellState<T>,
    last_error: Option<String>,
}

/// Single-writer, multi-reader latest-value store with change detection
#[derive(Debug)]
pub struct SensorResultCache<T> {
    cell: Mutex<ResultCell<T>>,
}

impl<T: Sample> SensorResultCache<T> {
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(ResultCell {
                state: CellState::Empty,
                last_error: None,
            }),
        }
    }

    /// Store a new value
    ///
    /// Returns `true` if the value will be reported as changed by the next
    /// `read()`. Publishing content identical to the current value leaves the
    /// consumed flag alone. Values are kept in publish order; capture times
    /// are not compared, so a wall-clock step backwards never freezes the cache.
    pub fn publish(&self, value: T) -> bool {
        let mut cell = lock_or_recover(&self.cell, "SensorResultCache");
        cell.last_error = None;

        let (next, pending) = match std::mem::replace(&mut cell.state, CellState::Empty) {
            CellState::Empty => (CellState::Unconsumed(value), true),
            CellState::Unconsumed(_) => (CellState::Unconsumed(value), true),
            CellState::Consumed(current) => {
                if value.same_content(&current) {
                    (CellState::Consumed(value), false)
                } else {
                    (CellState::Unconsumed(value), true)
                }
            }
        };
        cell.state = next;
        pending
    }

    /// Current value and whether it changed since the previous `read()`
    ///
    /// Marks the value consumed.
    pub fn read(&self) -> (Option<T>, bool) {
        let mut cell = lock_or_recover(&self.cell, "SensorResultCache");

        match std::mem::replace(&mut cell.state, CellState::Empty) {
            CellState::Empty => (None, false),
            CellState::Unconsumed(value) => {
                cell.state = CellState::Consumed(value.clone());
                (Some(value), true)
            }
            CellState::Consumed(value) => {
                cell.state = CellState::Consumed(value.clone());
                (Some(value), false)
            }
        }
    }

    /// Current value without consuming it
    pub fn peek(&self) -> Option<T> {
        let cell = lock_or_recover(&self.cell, "SensorResultCache");
        match &cell.state {
            CellState::Empty => None,
            CellState::Unconsumed(value) | CellState::Consumed(value) => Some(value.clone()),
        }
    }

    /// Record a failed poll. The stored value is left untouched.
    pub fn record_error(&self, error: impl Into<String>) {
        let mut cell = lock_or_recover(&self.cell, "SensorResultCache");
        cell.last_error = Some(error.into());
    }

    /// Error from the most recent poll, cleared by the next successful publish
    pub fn last_error(&self) -> Option<String> {
        lock_or_recover(&self.cell, "SensorResultCache").last_error.clone()
    }
}

impl<T: Sample> Default for SensorResultCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};
    use std::sync::Arc;
    use std::thread;

    fn reading(t: f64, h: f64) -> Reading {
        Reading::new(t, h, Local::now())
    }

    #[test]
    fn test_empty_cache_reports_no_data() {
        let cache: SensorResultCache<Reading> = SensorResultCache::new();
        assert_eq!(cache.read(), (None, false));
        assert!(cache.peek().is_none());
    }

    #[test]
    fn test_second_read_without_publish_is_unchanged() {
        let cache = SensorResultCache::new();
        let r1 = reading(22.4, 55.0);
        cache.publish(r1);

        assert_eq!(cache.read(), (Some(r1), true));
        assert_eq!(cache.read(), (Some(r1), false));
    }

    #[test]
    fn test_identical_publish_signals_once() {
        let cache = SensorResultCache::new();
        let r1 = reading(22.4, 55.0);

        assert!(cache.publish(r1));
        assert!(cache.publish(r1));
        let (value, changed) = cache.read();
        assert_eq!(value, Some(r1));
        assert!(changed);

        // Same values again after consumption: no spurious change
        let later = Reading::new(22.4, 55.0, r1.captured_at + Duration::seconds(20));
        assert!(!cache.publish(later));
        let (value, changed) = cache.read();
        assert!(!changed);
        assert_eq!(value.unwrap().captured_at, later.captured_at);
    }

    #[test]
    fn test_newer_value_overwrites_unconsumed() {
        let cache = SensorResultCache::new();
        let r1 = reading(20.0, 40.0);
        let r2 = Reading::new(21.0, 41.0, r1.captured_at + Duration::seconds(1));

        cache.publish(r1);
        cache.publish(r2);
        assert_eq!(cache.read(), (Some(r2), true));
        assert_eq!(cache.read(), (Some(r2), false));
    }

    #[test]
    fn test_clock_stepping_back_does_not_freeze_cache() {
        let cache = SensorResultCache::new();
        let before = reading(22.4, 55.0);
        // Wall clock corrected backwards between two polls
        let after = Reading::new(25.0, 50.0, before.captured_at - Duration::hours(1));

        cache.publish(before);
        cache.read();
        assert!(cache.publish(after));
        assert_eq!(cache.read(), (Some(after), true));
        assert_eq!(cache.read(), (Some(after), false));
    }

    #[test]
    fn test_errors_keep_previous_value() {
        let cache = SensorResultCache::new();
        let r1 = reading(22.4, 55.0);
        cache.publish(r1);
        cache.read();

        cache.record_error("bad line");
        assert_eq!(cache.last_error().as_deref(), Some("bad line"));
        assert_eq!(cache.read(), (Some(r1), false));

        let r2 = Reading::new(23.0, 50.0, r1.captured_at + Duration::seconds(1));
        cache.publish(r2);
        assert!(cache.last_error().is_none());
    }

    #[test]
    fn test_concurrent_publish_and_read_never_tear() {
        let cache = Arc::new(SensorResultCache::new());
        let writer_cache = Arc::clone(&cache);
        let base = Local::now();

        let writer = thread::spawn(move || {
            for i in 0..2000 {
                // Humidity mirrors temperature so a torn value is detectable
                let value = i as f64;
                writer_cache.publish(Reading::new(value, value, base + Duration::milliseconds(i)));
            }
        });

        let mut last_seen = f64::MIN;
        for _ in 0..2000 {
            if let (Some(r), _) = cache.read() {
                assert_eq!(r.temperature_celsius, r.humidity_percent);
                assert!(r.temperature_celsius >= last_seen);
                last_seen = r.temperature_celsius;
            }
        }
        writer.join().unwrap();
    }
}
