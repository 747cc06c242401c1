//! The scheduler actor.
//!
//! A `Scheduler` owns the wheel and runs a single-writer loop over three inputs: the
//! pulse source, the submission channel and the stop signal. Everything else talks to it
//! through a cloneable [`Handle`]. Submissions rendezvous with the loop, so a caller of
//! [`Handle::schedule`] is suspended until the loop has taken its task, and submissions and
//! pulses are applied in one strict order.
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::{bounded, never, select, tick, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{config::WheelConfig, WheelError};

use super::{
    task::{Entry, Task},
    wheel::{Resident, Wheel},
};

/// Two-tier timing wheel driven by a periodic pulse.
///
/// ```no_run
/// use std::time::Duration;
/// use tierwheel::{Scheduler, WheelConfig};
///
/// let scheduler = Scheduler::new(WheelConfig::new(1000, 59, Duration::from_millis(1)))?;
/// let handle = scheduler.handle();
/// let running = scheduler.spawn()?;
///
/// let task = handle.schedule(250)?;
/// task.wait();
///
/// handle.stop();
/// let _scheduler = running.join().unwrap();
/// # Ok::<(), tierwheel::WheelError>(())
/// ```
pub struct Scheduler {
    wheel: Wheel,
    drain_on_stop: bool,
    thread_name: String,
    pulses: Receiver<Instant>,
    submissions: Receiver<Entry>,
    stopped: Receiver<()>,
    handle: Handle,
}

/// Cross-thread surface of a [`Scheduler`]: submit tasks, request a stop.
#[derive(Clone)]
pub struct Handle {
    shared: Arc<Shared>,
}

struct Shared {
    max_delay: u64,
    submit: Sender<Entry>,
    // dropping the sender disconnects `stopped`, which every waiter sees at once
    stop: Mutex<Option<Sender<()>>>,
    stopped: Receiver<()>,
}

impl Scheduler {
    /// Wheel pulsed by an internal timer every `config.pulse_interval`.
    ///
    /// The timer is armed here, but nothing is processed until [`Scheduler::start`].
    pub fn new(config: WheelConfig) -> Result<Self, WheelError> {
        config.validate_timed()?;
        let pulses = tick(config.pulse_interval);
        Self::with_pulses(config, pulses)
    }

    /// Wheel pulsed by whatever arrives on `pulses`. `config.pulse_interval` is ignored.
    pub fn with_pulses(config: WheelConfig, pulses: Receiver<Instant>) -> Result<Self, WheelError> {
        let max_delay = config.capacity()?;
        let (submit, submissions) = bounded(0);
        let (stop, stopped) = bounded(0);

        let handle = Handle {
            shared: Arc::new(Shared {
                max_delay,
                submit,
                stop: Mutex::new(Some(stop)),
                stopped: stopped.clone(),
            }),
        };

        Ok(Scheduler {
            wheel: Wheel::new(config.tier1_size, config.tier2_size),
            drain_on_stop: config.drain_on_stop,
            thread_name: config.thread_name,
            pulses,
            submissions,
            stopped,
            handle,
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// See [`Handle::schedule`].
    pub fn schedule(&self, delay: u64) -> Result<Task, WheelError> {
        self.handle.schedule(delay)
    }

    /// See [`Handle::stop`].
    pub fn stop(&self) {
        self.handle.stop()
    }

    /// Largest accepted delay, in pulses.
    pub fn capacity(&self) -> u64 {
        self.handle.shared.max_delay
    }

    /// Current tier-1 cursor.
    pub fn position(&self) -> usize {
        self.wheel.position()
    }

    /// Tasks currently held by each tier.
    pub fn resident(&self) -> Resident {
        self.wheel.resident()
    }

    /// Run the loop on the calling thread until [`Handle::stop`] is called.
    ///
    /// Tasks still in the wheel when the loop exits are abandoned and never fire, unless
    /// the wheel was configured with `drain_on_stop`.
    pub fn start(&mut self) {
        info!(capacity = self.capacity(), "scheduler loop started");
        loop {
            let mut pulses_lost = false;
            select! {
                recv(self.pulses) -> pulse => match pulse {
                    Ok(_) => {
                        self.wheel.pulse();
                    }
                    Err(_) => pulses_lost = true,
                },
                recv(self.submissions) -> entry => {
                    // the handle we hold keeps the sender alive
                    if let Ok(entry) = entry {
                        self.wheel.place(entry);
                    }
                }
                recv(self.stopped) -> _ => break,
            }
            if pulses_lost {
                warn!("pulse source disconnected, wheel will no longer advance");
                self.pulses = never();
            }
        }

        if self.drain_on_stop {
            let fired = self.wheel.drain();
            debug!(fired, "drained wheel on stop");
        }
        info!(
            position = self.wheel.position(),
            abandoned = self.wheel.resident().total(),
            "scheduler loop stopped"
        );
    }

    /// Run [`Scheduler::start`] on a new named thread. Joining yields the scheduler back.
    pub fn spawn(self) -> Result<JoinHandle<Scheduler>, WheelError> {
        thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let mut scheduler = self;
                scheduler.start();
                scheduler
            })
            .map_err(|err| WheelError::Spawn(err.to_string()))
    }
}

impl Handle {
    /// Submit a task that fires `delay` pulses from now.
    ///
    /// Delays above the wheel capacity are rejected up front, without touching the loop.
    /// Otherwise this blocks until the loop accepts the task, and fails with
    /// [`WheelError::Stopped`] if the loop has been told to stop.
    pub fn schedule(&self, delay: u64) -> Result<Task, WheelError> {
        let max = self.shared.max_delay;
        if delay > max {
            return Err(WheelError::RejectedDelay { delay, max });
        }

        let (entry, task) = Entry::create(delay);
        select! {
            send(self.shared.submit, entry) -> sent => sent.map_err(|_| WheelError::Stopped)?,
            recv(self.shared.stopped) -> _ => return Err(WheelError::Stopped),
        }
        Ok(task)
    }

    /// Ask the loop to exit. Safe to call any number of times, from any thread.
    pub fn stop(&self) {
        self.shared.stop.lock().take();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stop.lock().is_none()
    }

    /// Largest accepted delay, in pulses.
    pub fn capacity(&self) -> u64 {
        self.shared.max_delay
    }
}
