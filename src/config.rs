//! # Guard runtime configuration.
//!
//! Provides [`GuardConfig`] — the settings for a [`LaunchGuard`](crate::LaunchGuard)
//! instance.
//!
//! The guard needs almost no configuration: its behavior is fixed by the
//! queue discipline, not by tunables. What remains here is the tick interval
//! that refreshes the depth gauge while the queue is idle, and the capacity
//! of the submission channel.
//!
//! ## Field semantics
//! - `tick`: interval between forced depth-gauge refreshes (min 1ms; clamped)
//! - `submit_capacity`: submission channel buffer (min 1; clamped)

use std::time::Duration;

/// Configuration for a [`LaunchGuard`](crate::LaunchGuard).
///
/// ## Notes
/// The defaults match production behavior; overriding `tick` is mainly
/// useful in tests that assert on idle gauge refresh without waiting the
/// full window.
#[derive(Clone, Copy, Debug)]
pub struct GuardConfig {
    /// Interval at which the run loop wakes with no queue effect, solely to
    /// re-emit the depth gauge while idle or stuck on a long cleanup.
    pub tick: Duration,

    /// Capacity of the submission channel.
    ///
    /// Submission is a blocking handoff either way (the caller waits for the
    /// loop's acknowledgement), so capacity only bounds how many submissions
    /// can be parked in the channel at once. Minimum 1 (clamped).
    pub submit_capacity: usize,
}

impl GuardConfig {
    /// Returns the tick interval clamped to a minimum of 1ms, so the loop
    /// timer can never be constructed with a zero period.
    #[inline]
    pub fn tick_clamped(&self) -> Duration {
        self.tick.max(Duration::from_millis(1))
    }

    /// Returns the submission channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn submit_capacity_clamped(&self) -> usize {
        self.submit_capacity.max(1)
    }
}

impl Default for GuardConfig {
    /// Default configuration:
    ///
    /// - `tick = 15s` (depth gauge refresh window)
    /// - `submit_capacity = 1` (pure handoff)
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(15),
            submit_capacity: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tick_is_fifteen_seconds() {
        let cfg = GuardConfig::default();
        assert_eq!(cfg.tick, Duration::from_secs(15));
        assert_eq!(cfg.submit_capacity, 1);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let cfg = GuardConfig {
            tick: Duration::ZERO,
            submit_capacity: 0,
        };
        assert_eq!(cfg.tick_clamped(), Duration::from_millis(1));
        assert_eq!(cfg.submit_capacity_clamped(), 1);
    }
}
