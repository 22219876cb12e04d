//! # Cleanup events: "teardown claimed a slot, hold launches until I finish."
//!
//! A real cleanup event is created by the executor's stop path via
//! [`LaunchGuard::submit_cleanup`](crate::LaunchGuard::submit_cleanup) and
//! completed by calling [`CleanupEvent::mark_done`] when teardown work
//! finishes. Completion is a [`CancellationToken`] becoming cancelled, which
//! can happen three ways — all equivalent to the guard:
//!
//! ```text
//! mark_done()            owner finished teardown        (normal)
//! parent token cancel    executor shutting down         (forced)
//! deadline elapsed       teardown overran its budget    (metered)
//! ```
//!
//! ## Rules
//! - `mark_done()` is **idempotent**: first caller wins, duplicates and
//!   concurrent calls are absorbed; the time-in-queue timer is recorded once
//! - the guard never enforces the deadline itself; the deadline sleep merely
//!   unblocks the queue, and the overrun is counted by the run loop
//! - the no-op variant is always already complete and never enters a queue

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::time::{Instant as TokioInstant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::metrics::{Reporter, names};

/// Shared state of a real cleanup event.
struct RealCleanup {
    /// When the event was constructed; basis for the time-in-queue timer.
    created_at: Instant,
    /// Absolute budget for the teardown, if any.
    deadline: Option<Instant>,
    /// Child of the owner's parent token; cancelled = complete.
    token: CancellationToken,
    /// First `mark_done` wins; guards the timer metric and the cancel.
    done: AtomicBool,
    /// Set when `mark_done` beat the deadline, so a late loop observation is
    /// not miscounted as an overrun.
    done_in_time: AtomicBool,
    reporter: Arc<dyn Reporter>,
}

/// Handle to a cleanup event.
///
/// Cheap to clone; the guard keeps one clone in its queue while the owner
/// keeps another for [`mark_done`](Self::mark_done).
#[derive(Clone)]
pub struct CleanupEvent {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    Real(Arc<RealCleanup>),
    Noop,
}

impl CleanupEvent {
    /// Builds a real event. Called by the guard during `submit_cleanup`;
    /// the handle is not live until the run loop has accepted it.
    pub(crate) fn real(
        reporter: Arc<dyn Reporter>,
        parent: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Self {
        let now = Instant::now();
        Self {
            inner: Inner::Real(Arc::new(RealCleanup {
                created_at: now,
                deadline: deadline.map(|d| now + d),
                token: parent.child_token(),
                done: AtomicBool::new(false),
                done_in_time: AtomicBool::new(false),
                reporter,
            })),
        }
    }

    /// Returns an event that is always already complete.
    ///
    /// For stop paths where the container never started, so no launch
    /// ordering constraint exists. Never registered with a guard.
    pub fn noop() -> Self {
        Self { inner: Inner::Noop }
    }

    /// Marks the teardown as finished, releasing the guard's wait.
    ///
    /// Idempotent: only the first call (across threads) records the
    /// `executor.cleanup_event.time_in_queue` timer and cancels the token;
    /// duplicates are silently absorbed. No-op variant: does nothing.
    pub fn mark_done(&self) {
        let Inner::Real(ev) = &self.inner else {
            return;
        };
        if ev.done.swap(true, Ordering::AcqRel) {
            return;
        }
        let in_time = ev.deadline.map_or(true, |d| Instant::now() < d);
        ev.done_in_time.store(in_time, Ordering::Release);
        ev.reporter
            .timer(names::CLEANUP_TIME_IN_QUEUE, ev.created_at.elapsed());
        ev.token.cancel();
    }

    /// Resolves once the event is complete: `mark_done` was called, the
    /// parent token was cancelled, or the deadline elapsed.
    ///
    /// Guard-internal; only the run loop is expected to wait here, though the
    /// future is safe to await from multiple places.
    pub(crate) async fn completed(&self) {
        let Inner::Real(ev) = &self.inner else {
            return;
        };
        match ev.deadline {
            Some(d) => {
                tokio::select! {
                    _ = ev.token.cancelled() => {}
                    _ = sleep_until(TokioInstant::from_std(d)) => {}
                }
            }
            None => ev.token.cancelled().await,
        }
    }

    /// True when the deadline fired before `mark_done` did.
    ///
    /// Checked by the run loop right after `completed()`; a late
    /// `mark_done` past the deadline still counts as an overrun.
    pub(crate) fn deadline_exceeded(&self) -> bool {
        match &self.inner {
            Inner::Real(ev) => match ev.deadline {
                Some(d) => Instant::now() >= d && !ev.done_in_time.load(Ordering::Acquire),
                None => false,
            },
            Inner::Noop => false,
        }
    }
}
