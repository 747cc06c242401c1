//! Synchronization primitives shared between the scheduler loop and its callers.
pub mod signal;
