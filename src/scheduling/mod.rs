//! Delay scheduling on a two-tier timing wheel.
//!
//! `wheel` holds the bucketing and rotation logic, `task` the caller handles and slot
//! storage, and `scheduler` the single-writer loop that drives the wheel from a pulse.
pub mod scheduler;
pub mod task;
pub mod wheel;
