//! Repeating background timer
//!
//! Runs a blocking task on a dedicated thread at a target interval. Exactly
//! one invocation is in flight at a time: if the task takes longer than the
//! interval the next invocation starts immediately, otherwise the worker
//! sleeps for the remainder. The task receives a `StopToken` and is expected
//! to check it between blocking steps so `stop()` returns promptly.

use crate::stop_token::{stop_pair, StopHandle, StopToken};
use crate::sync::lock_or_recover;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Errors starting a timer
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("failed to spawn worker thread for {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Most recent outcome stored by the worker
#[derive(Debug, Clone, PartialEq)]
pub enum TimerResult<T> {
    /// No iteration has completed yet
    Pending,
    /// The last iteration returned a value
    Ready(T),
    /// The last iteration failed
    Failed(String),
}

impl<T> TimerResult<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, TimerResult::Pending)
    }

    pub fn ready(self) -> Option<T> {
        match self {
            TimerResult::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// A task executed repeatedly on its own thread until stopped
pub struct RepeatedTimer<T> {
    name: String,
    interval: Duration,
    last: Arc<Mutex<TimerResult<T>>>,
    stop: StopHandle,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> RepeatedTimer<T> {
    /// Spawn the worker and begin invoking `task` every `interval`
    ///
    /// The first invocation happens immediately.
    pub fn start<F, E>(name: impl Into<String>, interval: Duration, task: F) -> Result<Self, TimerError>
    where
        F: FnMut(&StopToken) -> Result<T, E> + Send + 'static,
        E: Display + 'static,
    {
        let name = name.into();
        let last = Arc::new(Mutex::new(TimerResult::Pending));
        let (stop, token) = stop_pair();

        let worker = {
            let last = Arc::clone(&last);
            let name = name.clone();
            thread::Builder::new()
                .name(format!("timer-{}", name))
                .spawn(move || run_loop(&name, interval, &token, &last, task))
        }
        .map_err(|source| TimerError::Spawn {
            name: name.clone(),
            source,
        })?;

        log::info!("{}: timer started ({:?} interval)", name, interval);

        Ok(Self {
            name,
            interval,
            last,
            stop,
            worker: Some(worker),
        })
    }
}

impl<T> RepeatedTimer<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True until `stop()` has been called
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// The most recently stored outcome, without blocking on the task
    pub fn result(&self) -> TimerResult<T>
    where
        T: Clone,
    {
        lock_or_recover(&self.last, &self.name).clone()
    }

    /// Signal the worker and wait for it to exit
    ///
    /// Waits for the current invocation to return. Calling `stop()` again is
    /// a no-op.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.stop.stop();
        if let Err(e) = worker.join() {
            log::warn!("{}: timer thread panicked: {:?}", self.name, e);
        }
        log::info!("{}: timer stopped", self.name);
    }
}

impl<T> Drop for RepeatedTimer<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<T, F, E>(
    name: &str,
    interval: Duration,
    token: &StopToken,
    last: &Mutex<TimerResult<T>>,
    mut task: F,
) where
    F: FnMut(&StopToken) -> Result<T, E>,
    E: Display,
{
    while !token.is_stopped() {
        let started = Instant::now();

        let outcome = match task(token) {
            Ok(value) => TimerResult::Ready(value),
            Err(e) => TimerResult::Failed(e.to_string()),
        };

        // A task interrupted by stop has nothing worth publishing
        if token.is_stopped() {
            break;
        }

        if let TimerResult::Failed(ref message) = outcome {
            log::debug!("{}: iteration failed: {}", name, message);
        }
        *lock_or_recover(last, name) = outcome;

        let elapsed = started.elapsed();
        log::trace!("{}: iteration took {:?}", name, elapsed);

        let remaining = interval.saturating_sub(elapsed);
        if !remaining.is_zero() && token.wait_timeout(remaining) {
            break;
        }
    }
    log::debug!("{}: timer thread exiting", name);
}
