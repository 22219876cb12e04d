//! # Launch events: "a start wants a slot, tell me when it is safe."
//!
//! A real launch event is created by the executor's start path via
//! [`LaunchGuard::submit_launch`](crate::LaunchGuard::submit_launch). The
//! owner then awaits [`LaunchEvent::cleared`], which resolves once every
//! event accepted before it has drained and the run loop grants clearance.
//!
//! ## Rules
//! - clearance is granted **only** by the run loop, when the event reaches
//!   the head of the queue
//! - no cancellation: once accepted, a launch event is always eventually
//!   cleared (the guard never drops launches)
//! - the no-op variant is always already cleared and never enters a queue

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::metrics::{Reporter, names};

/// Shared state of a real launch event.
struct RealLaunch {
    /// When the event was constructed; basis for the time-in-queue timer.
    created_at: Instant,
    /// Cancelled = clearance granted.
    token: CancellationToken,
    /// First `grant_clearance` wins; guards the timer metric and the cancel.
    granted: AtomicBool,
    reporter: Arc<dyn Reporter>,
}

/// Handle to a launch event.
///
/// Cheap to clone; the guard keeps one clone in its queue while the owner
/// keeps another to await [`cleared`](Self::cleared).
#[derive(Clone)]
pub struct LaunchEvent {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    Real(Arc<RealLaunch>),
    Noop,
}

impl LaunchEvent {
    /// Builds a real event. Called by the guard during `submit_launch`;
    /// the handle is not live until the run loop has accepted it.
    pub(crate) fn real(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            inner: Inner::Real(Arc::new(RealLaunch {
                created_at: Instant::now(),
                token: CancellationToken::new(),
                granted: AtomicBool::new(false),
                reporter,
            })),
        }
    }

    /// Returns an event that is always already cleared.
    ///
    /// For start paths where no coordination is required. Never registered
    /// with a guard.
    pub fn noop() -> Self {
        Self { inner: Inner::Noop }
    }

    /// Resolves once the guard has granted clearance to proceed.
    ///
    /// Owner-side wait. Safe to await from multiple tasks; all of them
    /// unblock on the same grant. No-op variant: resolves immediately.
    pub async fn cleared(&self) {
        if let Inner::Real(ev) = &self.inner {
            ev.token.cancelled().await;
        }
    }

    /// True once clearance has been granted (or always, for a no-op).
    pub fn is_cleared(&self) -> bool {
        match &self.inner {
            Inner::Real(ev) => ev.token.is_cancelled(),
            Inner::Noop => true,
        }
    }

    /// Grants clearance. Driven by the run loop when this event reaches the
    /// head of the queue.
    ///
    /// Idempotent: only the first call records the
    /// `executor.launch_event.time_in_queue` timer and signals the waiters.
    pub(crate) fn grant_clearance(&self) {
        let Inner::Real(ev) = &self.inner else {
            return;
        };
        if ev.granted.swap(true, Ordering::AcqRel) {
            return;
        }
        ev.reporter
            .timer(names::LAUNCH_TIME_IN_QUEUE, ev.created_at.elapsed());
        ev.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::metrics::recording::RecordingReporter;

    #[tokio::test]
    async fn test_noop_is_immediately_cleared() {
        let ev = LaunchEvent::noop();
        assert!(ev.is_cleared());
        tokio::time::timeout(Duration::from_millis(50), ev.cleared())
            .await
            .expect("no-op launch must already be cleared");
    }

    #[tokio::test]
    async fn test_clearance_unblocks_waiter_and_records_timer_once() {
        let rep = Arc::new(RecordingReporter::default());
        let ev = LaunchEvent::real(rep.clone());
        assert!(!ev.is_cleared());

        let waiter = {
            let e = ev.clone();
            tokio::spawn(async move { e.cleared().await })
        };

        ev.grant_clearance();
        ev.grant_clearance();
        tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .expect("waiter must unblock on clearance")
            .unwrap();

        assert!(ev.is_cleared());
        assert_eq!(rep.timer_count(names::LAUNCH_TIME_IN_QUEUE), 1);
    }

    #[tokio::test]
    async fn test_concurrent_grants_record_once() {
        let rep = Arc::new(RecordingReporter::default());
        let ev = LaunchEvent::real(rep.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let e = ev.clone();
            handles.push(tokio::spawn(async move { e.grant_clearance() }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(rep.timer_count(names::LAUNCH_TIME_IN_QUEUE), 1);
    }

    #[tokio::test]
    async fn test_multiple_waiters_all_unblock() {
        let rep = Arc::new(RecordingReporter::default());
        let ev = LaunchEvent::real(rep);

        let mut waiters = Vec::new();
        for _ in 0..4 {
            let e = ev.clone();
            waiters.push(tokio::spawn(async move { e.cleared().await }));
        }
        ev.grant_clearance();
        for w in waiters {
            tokio::time::timeout(Duration::from_millis(100), w)
                .await
                .expect("every waiter unblocks")
                .unwrap();
        }
    }
}
