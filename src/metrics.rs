//! # Metrics seam for the guard.
//!
//! [`Reporter`] is the extension point for plugging a metrics pipeline into
//! the guard. The guard calls it synchronously from the run loop and from
//! event completion paths, so implementations must be cheap and non-blocking
//! (hand off to a channel or an atomic, not to the network).
//!
//! ## Emitted series
//! | Name | Kind | When |
//! |------|------|------|
//! | `executor.launch_guard.depth` | gauge | every loop iteration |
//! | `executor.cleanup_event.time_in_queue` | timer | first `mark_done()` |
//! | `executor.launch_event.time_in_queue` | timer | clearance granted |
//! | `executor.launch_guard.deadline_exceeded` | counter | cleanup completed past its deadline |
//!
//! The names are stable; operational dashboards key on them.

use std::time::Duration;

/// Metric names emitted by the guard, kept in one place so dashboards and
/// tests reference the same strings.
pub mod names {
    /// Gauge of the current queue depth.
    pub const DEPTH: &str = "executor.launch_guard.depth";
    /// Timer of a cleanup event's residence in the queue.
    pub const CLEANUP_TIME_IN_QUEUE: &str = "executor.cleanup_event.time_in_queue";
    /// Timer of a launch event's residence in the queue.
    pub const LAUNCH_TIME_IN_QUEUE: &str = "executor.launch_event.time_in_queue";
    /// Counter of cleanups that completed only after their deadline.
    pub const DEADLINE_EXCEEDED: &str = "executor.launch_guard.deadline_exceeded";
}

/// Contract for metric sinks.
///
/// Called from the guard's run loop and from whichever task completes an
/// event, concurrently. Implementations must be thread-safe and should not
/// block.
pub trait Reporter: Send + Sync + 'static {
    /// Records an instantaneous value.
    fn gauge(&self, name: &'static str, value: u64);

    /// Records an elapsed duration.
    fn timer(&self, name: &'static str, elapsed: Duration);

    /// Increments a counter by `delta`.
    fn counter(&self, name: &'static str, delta: u64);
}

/// Reporter that discards everything.
///
/// For embedders without a metrics pipeline; the guard works identically,
/// it just reports into the void.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn gauge(&self, _name: &'static str, _value: u64) {}
    fn timer(&self, _name: &'static str, _elapsed: Duration) {}
    fn counter(&self, _name: &'static str, _delta: u64) {}
}

/// Reporter that writes every sample through `tracing` at info level.
///
/// Enabled via the `logging` feature. Useful for development and demos; not
/// intended as a production metrics pipeline — implement [`Reporter`] against
/// your own sink for that.
#[cfg(feature = "logging")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

#[cfg(feature = "logging")]
impl Reporter for LogReporter {
    fn gauge(&self, name: &'static str, value: u64) {
        tracing::info!(metric = name, value, "gauge");
    }

    fn timer(&self, name: &'static str, elapsed: Duration) {
        tracing::info!(metric = name, elapsed_ms = elapsed.as_millis() as u64, "timer");
    }

    fn counter(&self, name: &'static str, delta: u64) {
        tracing::info!(metric = name, delta, "counter");
    }
}
