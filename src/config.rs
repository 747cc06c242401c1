//! Wheel configuration.
use std::time::Duration;

use crate::WheelError;

/// Sizing and behaviour of a [`Scheduler`](crate::scheduling::scheduler::Scheduler).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tierwheel::config::WheelConfig;
///
/// let config = WheelConfig::new(1000, 59, Duration::from_millis(1))
///     .drain_on_stop(true)
///     .thread_name("expiry-wheel");
/// assert_eq!(config.capacity().unwrap(), 59_999);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelConfig {
    pub tier1_size: usize,
    pub tier2_size: usize,
    pub pulse_interval: Duration,
    /// Fire every resident task when the loop stops, instead of abandoning them.
    pub drain_on_stop: bool,
    /// Name given to the loop thread by `Scheduler::spawn`.
    pub thread_name: String,
}

impl WheelConfig {
    pub fn new(tier1_size: usize, tier2_size: usize, pulse_interval: Duration) -> Self {
        Self {
            tier1_size,
            tier2_size,
            pulse_interval,
            drain_on_stop: false,
            thread_name: String::from("tierwheel"),
        }
    }

    pub fn drain_on_stop(mut self, drain: bool) -> Self {
        self.drain_on_stop = drain;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Largest delay, in pulses, the wheel accepts: `tier1 * (tier2 + 1) - 1`.
    pub fn capacity(&self) -> Result<u64, WheelError> {
        if self.tier1_size == 0 {
            return Err(WheelError::ZeroTier1);
        }
        let t1 = self.tier1_size as u64;
        let span = (self.tier2_size as u64)
            .checked_add(1)
            .and_then(|rotations| rotations.checked_mul(t1))
            .ok_or(WheelError::CapacityOverflow)?;
        // placement adds the cursor (< t1) to the delay
        span.checked_add(t1).ok_or(WheelError::CapacityOverflow)?;
        Ok(span - 1)
    }

    /// Checks the sizing, ignoring the pulse interval.
    pub fn validate(&self) -> Result<(), WheelError> {
        self.capacity().map(|_| ())
    }

    /// Checks everything needed to arm the internal pulse timer.
    pub fn validate_timed(&self) -> Result<(), WheelError> {
        self.validate()?;
        if self.pulse_interval.is_zero() {
            return Err(WheelError::ZeroPulseInterval);
        }
        Ok(())
    }
}
