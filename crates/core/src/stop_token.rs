//! Cooperative cancellation for blocking worker loops
//!
//! A `StopHandle`/`StopToken` pair is created together. The worker holds the
//! token and checks it between blocking steps; the owner calls
//! `StopHandle::stop()` and then joins the worker. Stopping drops the wakeup
//! sender, so any `wait_timeout` in progress returns immediately.

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Create a connected stop handle and token
pub fn stop_pair() -> (StopHandle, StopToken) {
    let stopped = Arc::new(AtomicBool::new(false));
    let (tx, rx) = bounded::<()>(0);

    let handle = StopHandle {
        stopped: Arc::clone(&stopped),
        wakeup: Some(tx),
    };
    let token = StopToken {
        stopped,
        wakeup: rx,
        _detached: None,
    };
    (handle, token)
}

/// Owner side: requests the worker to stop
#[derive(Debug)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    wakeup: Option<Sender<()>>,
}

impl StopHandle {
    /// Signal stop. Safe to call more than once.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        // Disconnects the channel, waking any sleeping worker
        self.wakeup.take();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker side: observed between blocking steps
#[derive(Debug, Clone)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
    wakeup: Receiver<()>,
    /// Keeps the channel open for tokens that have no owner
    _detached: Option<Arc<Sender<()>>>,
}

impl StopToken {
    /// A token that is never stopped, for one-off synchronous reads
    pub fn detached() -> Self {
        let (tx, rx) = bounded::<()>(0);
        Self {
            stopped: Arc::new(AtomicBool::new(false)),
            wakeup: rx,
            _detached: Some(Arc::new(tx)),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`, waking early on stop.
    ///
    /// Returns `true` if stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }
        match self.wakeup.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_stopped(),
            Err(RecvTimeoutError::Disconnected) | Ok(()) => true,
        }
    }
}
