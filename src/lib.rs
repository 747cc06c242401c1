//! Two-tier timing wheel delay scheduler.
//!
//! Callers ask a [`Scheduler`] for a [`Task`] that completes after a number of pulses. The
//! wheel buckets tasks into a near tier (one slot per pulse) and a far tier (one slot per
//! near rotation), so each pulse costs O(1) amortized regardless of how many tasks are
//! pending. All wheel state is owned by a single loop thread; callers only talk to it
//! through channels.
use thiserror::Error;

pub mod config;
pub mod scheduling;
pub mod sync;

pub use config::WheelConfig;
pub use scheduling::{
    scheduler::{Handle, Scheduler},
    task::Task,
    wheel::Resident,
};

/// Error type for the wheel and its scheduler
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WheelError {
    #[error("delay of {delay} pulses exceeds wheel capacity of {max}")]
    RejectedDelay { delay: u64, max: u64 },
    #[error("tier-1 must have at least one slot")]
    ZeroTier1,
    #[error("wheel capacity does not fit in a u64")]
    CapacityOverflow,
    #[error("pulse interval must be non-zero")]
    ZeroPulseInterval,
    #[error("scheduler has been stopped")]
    Stopped,
    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(String),
}
