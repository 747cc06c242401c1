//! One-shot broadcast signal.
//!
//! A `Signal` starts unfired and can be fired exactly once by its owner. Any number of
//! observers may block on it, from any thread, and every observer (including ones that
//! arrive after the fact) sees it fired as soon as it is.
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Flag + condition variable pair with fire-once semantics.
#[derive(Debug, Default)]
pub struct Signal {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    /// New, unfired signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the signal fired and wake every observer.
    ///
    /// Only the scheduler loop fires signals, and only once per task.
    pub(crate) fn fire(&self) {
        let mut fired = self.fired.lock();
        debug_assert!(!*fired, "signal fired twice");
        *fired = true;
        self.cond.notify_all();
    }

    /// Non-blocking probe.
    pub fn is_fired(&self) -> bool {
        *self.fired.lock()
    }

    /// Block until fired. Returns immediately if it already has been.
    pub fn wait(&self) {
        let mut fired = self.fired.lock();
        while !*fired {
            self.cond.wait(&mut fired);
        }
    }

    /// Block until fired or until `timeout` elapses. Returns whether the signal fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut fired = self.fired.lock();
        while !*fired {
            if self.cond.wait_until(&mut fired, deadline).timed_out() {
                break;
            }
        }
        *fired
    }
}
