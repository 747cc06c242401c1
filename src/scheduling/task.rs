//! Tasks and the slots that hold them.
use std::{sync::Arc, time::Duration};

use crate::sync::signal::Signal;

/// Caller-side handle to one scheduled delay.
///
/// Clones share the same completion signal, so any number of threads can wait on it.
#[derive(Debug, Clone)]
pub struct Task {
    signal: Arc<Signal>,
}

impl Task {
    fn new() -> Self {
        Self {
            signal: Arc::new(Signal::new()),
        }
    }

    /// Block until the task fires.
    ///
    /// A task still resident in the wheel when the scheduler stops (without draining)
    /// never fires, and this call then never returns. Use [`Task::wait_timeout`] to
    /// bound the wait.
    pub fn wait(&self) {
        self.signal.wait()
    }

    /// Block until the task fires or `timeout` elapses. Returns whether it fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.signal.wait_timeout(timeout)
    }

    /// Whether the task has fired.
    pub fn is_done(&self) -> bool {
        self.signal.is_fired()
    }
}

/// Wheel-side record of a task: its delay plus the signal to fire.
///
/// `delay` starts as the requested offset from the cursor; placement rewrites it to the
/// absolute tier-1 index the entry belongs in.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) delay: u64,
    signal: Arc<Signal>,
}

impl Entry {
    /// Build an entry and the caller handle observing it.
    pub(crate) fn create(delay: u64) -> (Entry, Task) {
        let task = Task::new();
        let entry = Entry {
            delay,
            signal: Arc::clone(&task.signal),
        };
        (entry, task)
    }

    /// Consumes the entry, so a task can only be fired once.
    pub(crate) fn fire(self) {
        self.signal.fire()
    }
}

/// Bucket of entries that fire (or get promoted) together.
#[derive(Debug, Default)]
pub(crate) struct Slot {
    entries: Vec<Entry>,
}

impl Slot {
    pub(crate) fn register(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Empty the slot, handing back what it held.
    pub(crate) fn take(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }
}
