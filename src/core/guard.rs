//! # LaunchGuard: serialized launch/cleanup coordination.
//!
//! The [`LaunchGuard`] orders concurrent container start ("launch") and stop
//! ("cleanup") requests that contend for node-level resource slots. Launching
//! into a slot whose previous occupant is still tearing down leaks resources,
//! so every launch waits behind every cleanup accepted before it.
//!
//! ## Architecture
//! ```text
//! stop path ── submit_cleanup() ──┐                   ┌─► CleanupEvent.mark_done()
//!                                 │  (blocking        │         (owner side)
//! start path ── submit_launch() ──┤   handoff)        │
//!                                 ▼                   │
//!                     ┌──────────────────────┐        │
//!                     │   run loop (1 task)  │◄───────┘
//!                     │   VecDeque<GuardEvent>        completion observed
//!                     │                      │
//!                     │  Empty ◄──────────┐  │
//!                     │    │ cleanup      │  │
//!                     │    ▼              │  │
//!                     │  WaitingOnCleanup │  │
//!                     │    │ head done    │  │
//!                     │    ▼              │  │
//!                     │  DoLaunch ────────┘  │──► LaunchEvent cleared
//!                     └──────────────────────┘        (owner awaits)
//! ```
//!
//! ## Rules
//! - **Single owner**: only the run loop touches the queue; no locks
//! - **Global FIFO**: one submission channel across both kinds, so arrival
//!   order is acceptance order; nothing jumps the queue
//! - **Head only**: the loop waits on the head event alone; everything
//!   behind it stays untouched
//! - **Blocking handoff**: `submit_*` resolves only after the loop has
//!   appended the event to the queue (acknowledged over a oneshot)
//! - **Depth gauge**: re-emitted on every loop iteration; a periodic tick
//!   wakes the loop so the gauge stays fresh while idle or stuck
//!
//! ## Lifetime
//! Dropping the guard closes the submission channel. The loop drains the
//! events already queued (so pending launches are still cleared) and exits.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::config::GuardConfig;
use crate::error::GuardError;
use crate::events::{CleanupEvent, GuardEvent, LaunchEvent};
use crate::metrics::{Reporter, names};

/// State of the run loop; a pure function of the queue head.
///
/// Modeled explicitly (rather than re-inspecting the head everywhere) for
/// control-flow clarity and metric attribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    /// The queue is empty; waiting for the next submission.
    Empty,
    /// The head is a cleanup event; waiting for it to complete.
    WaitingOnCleanup,
    /// The head is a launch event; granting clearance.
    DoLaunch,
}

/// A submission in flight: the event plus the handoff acknowledgement.
struct Submission {
    event: GuardEvent,
    /// Signalled once the loop has appended the event to its queue.
    accepted: oneshot::Sender<()>,
}

/// Coordinates the starting and shutting down of containers.
///
/// One guard per executor process. Construction spawns the run loop
/// immediately, so a guard must be created inside a Tokio runtime.
pub struct LaunchGuard {
    reporter: Arc<dyn Reporter>,
    submit_tx: mpsc::Sender<Submission>,
}

impl LaunchGuard {
    /// Creates a guard with the default configuration (15s tick).
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self::with_config(reporter, GuardConfig::default())
    }

    /// Creates a guard with an explicit configuration and starts its run
    /// loop on the current Tokio runtime.
    pub fn with_config(reporter: Arc<dyn Reporter>, cfg: GuardConfig) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel(cfg.submit_capacity_clamped());
        let run = GuardLoop {
            reporter: Arc::clone(&reporter),
            rx: submit_rx,
            queue: VecDeque::new(),
            open: true,
            tick: cfg.tick_clamped(),
        };
        tokio::spawn(async move {
            match run.run().await {
                Ok(()) => trace!("launch guard loop drained and exited"),
                Err(e) => error!(label = e.as_label(), "launch guard loop fatal: {e}"),
            }
        });
        Self {
            reporter,
            submit_tx,
        }
    }

    /// Submits a real cleanup event and returns its handle.
    ///
    /// Blocking handoff: resolves only once the run loop has accepted the
    /// event into its queue. Every launch submitted after this point waits
    /// for the returned event to complete.
    ///
    /// The event's completion token is derived from `parent`: cancelling
    /// `parent` completes the event exactly as [`CleanupEvent::mark_done`]
    /// would. An optional `deadline` bounds the teardown budget; overruns
    /// are metered, not errors, and still advance the queue.
    ///
    /// # Panics
    /// Panics if the run loop has terminated, which only happens after a
    /// fatal invariant violation.
    pub async fn submit_cleanup(
        &self,
        parent: &CancellationToken,
        deadline: Option<Duration>,
    ) -> CleanupEvent {
        let event = CleanupEvent::real(Arc::clone(&self.reporter), parent, deadline);
        self.handoff(GuardEvent::Cleanup(event.clone())).await;
        event
    }

    /// Submits a real launch event and returns its handle.
    ///
    /// Blocking handoff, same contract as [`submit_cleanup`](Self::submit_cleanup).
    /// The owner then awaits [`LaunchEvent::cleared`]; clearance arrives once
    /// every event accepted before this one has drained. Launch events carry
    /// no cancellation: once accepted they are always eventually cleared.
    ///
    /// # Panics
    /// Panics if the run loop has terminated, which only happens after a
    /// fatal invariant violation.
    pub async fn submit_launch(&self) -> LaunchEvent {
        let event = LaunchEvent::real(Arc::clone(&self.reporter));
        self.handoff(GuardEvent::Launch(event.clone())).await;
        event
    }

    /// Hands an event to the run loop and waits for the acceptance ack.
    async fn handoff(&self, event: GuardEvent) {
        let (accepted, ack) = oneshot::channel();
        if self
            .submit_tx
            .send(Submission { event, accepted })
            .await
            .is_err()
        {
            panic!("launch guard loop terminated; submissions cannot be accepted");
        }
        if ack.await.is_err() {
            panic!("launch guard loop dropped a submission before enqueueing it");
        }
    }
}

/// What woke the run loop up.
enum Wake {
    /// A submission arrived and must be appended.
    Accepted(Submission),
    /// The submission channel closed (guard dropped).
    Closed,
    /// The head cleanup event signalled completion.
    HeadDone,
    /// Periodic tick; no queue effect, refreshes the depth gauge.
    Tick,
}

/// The run loop's exclusive state. Lives on one spawned task for the guard's
/// whole lifetime; nothing else ever touches the queue.
struct GuardLoop {
    reporter: Arc<dyn Reporter>,
    rx: mpsc::Receiver<Submission>,
    queue: VecDeque<GuardEvent>,
    /// False once the guard handle was dropped; the loop then only drains.
    open: bool,
    tick: Duration,
}

impl GuardLoop {
    async fn run(mut self) -> Result<(), GuardError> {
        let period = self.tick;
        let mut tick = time::interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut state = GuardState::Empty;
        loop {
            if !self.open && self.queue.is_empty() {
                break;
            }
            state = match state {
                GuardState::Empty => self.dispatch_empty(&mut tick).await,
                GuardState::WaitingOnCleanup => self.dispatch_waiting(&mut tick).await?,
                GuardState::DoLaunch => self.do_launch()?,
            };
            self.reporter.gauge(names::DEPTH, self.queue.len() as u64);
        }
        Ok(())
    }

    /// Empty state: waits for a submission or a tick.
    async fn dispatch_empty(&mut self, tick: &mut Interval) -> GuardState {
        let wake = tokio::select! {
            sub = self.rx.recv() => match sub {
                Some(s) => Wake::Accepted(s),
                None => Wake::Closed,
            },
            _ = tick.tick() => Wake::Tick,
        };
        match wake {
            Wake::Accepted(s) => {
                self.accept(s);
                self.derive_state()
            }
            Wake::Closed => {
                self.open = false;
                GuardState::Empty
            }
            // No head exists in the empty state; ticks only refresh the gauge.
            Wake::Tick | Wake::HeadDone => GuardState::Empty,
        }
    }

    /// WaitingOnCleanup state: waits on whichever fires first of the head's
    /// completion, a new submission, or the tick. New submissions append to
    /// the tail and the state stays put; only head completion advances.
    async fn dispatch_waiting(&mut self, tick: &mut Interval) -> Result<GuardState, GuardError> {
        let head = match self.queue.front() {
            Some(GuardEvent::Cleanup(c)) => c.clone(),
            Some(GuardEvent::Launch(_)) => {
                return Err(GuardError::InvariantViolation {
                    state: GuardState::WaitingOnCleanup,
                    detail: "head is not a cleanup event",
                });
            }
            None => {
                return Err(GuardError::InvariantViolation {
                    state: GuardState::WaitingOnCleanup,
                    detail: "queue is empty",
                });
            }
        };

        let wake = tokio::select! {
            _ = head.completed() => Wake::HeadDone,
            sub = self.rx.recv(), if self.open => match sub {
                Some(s) => Wake::Accepted(s),
                None => Wake::Closed,
            },
            _ = tick.tick() => Wake::Tick,
        };
        match wake {
            Wake::HeadDone => {
                if head.deadline_exceeded() {
                    debug!("cleanup event completed past its deadline");
                    self.reporter.counter(names::DEADLINE_EXCEEDED, 1);
                }
                self.queue.pop_front();
                Ok(self.derive_state())
            }
            Wake::Accepted(s) => {
                self.accept(s);
                Ok(GuardState::WaitingOnCleanup)
            }
            Wake::Closed => {
                self.open = false;
                Ok(GuardState::WaitingOnCleanup)
            }
            Wake::Tick => Ok(GuardState::WaitingOnCleanup),
        }
    }

    /// DoLaunch state: grants clearance to the head launch event, pops it,
    /// and re-derives. Never blocks.
    fn do_launch(&mut self) -> Result<GuardState, GuardError> {
        match self.queue.pop_front() {
            Some(GuardEvent::Launch(l)) => {
                l.grant_clearance();
                trace!(depth = self.queue.len(), "launch clearance granted");
                Ok(self.derive_state())
            }
            Some(GuardEvent::Cleanup(_)) => Err(GuardError::InvariantViolation {
                state: GuardState::DoLaunch,
                detail: "head is not a launch event",
            }),
            None => Err(GuardError::InvariantViolation {
                state: GuardState::DoLaunch,
                detail: "queue is empty",
            }),
        }
    }

    /// Appends a submission to the tail and acknowledges the handoff.
    ///
    /// The ack is sent strictly after the push, which is what makes
    /// `submit_*` a blocking handoff. A submitter that vanished before the
    /// ack is ignored; its event stays queued and is processed normally.
    fn accept(&mut self, s: Submission) {
        debug!(kind = s.event.kind(), depth = self.queue.len() + 1, "event accepted");
        self.queue.push_back(s.event);
        let _ = s.accepted.send(());
    }

    /// Next state, derived purely from the kind of the new head.
    fn derive_state(&self) -> GuardState {
        match self.queue.front() {
            None => GuardState::Empty,
            Some(GuardEvent::Cleanup(_)) => GuardState::WaitingOnCleanup,
            Some(GuardEvent::Launch(_)) => GuardState::DoLaunch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::recording::RecordingReporter;

    const CLEAR_BOUND: Duration = Duration::from_millis(100);
    const BLOCK_WINDOW: Duration = Duration::from_millis(250);

    fn guard() -> (LaunchGuard, Arc<RecordingReporter>) {
        let rep = Arc::new(RecordingReporter::default());
        (LaunchGuard::new(rep.clone()), rep)
    }

    /// Polls until `pred` holds or the deadline passes.
    async fn wait_until(pred: impl Fn() -> bool, deadline: Duration) -> bool {
        let end = Instant::now() + deadline;
        while Instant::now() < end {
            if pred() {
                return true;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        pred()
    }

    #[tokio::test]
    async fn test_lone_launch_clears_immediately() {
        let (guard, _rep) = guard();
        let launch = guard.submit_launch().await;
        time::timeout(Duration::from_millis(50), launch.cleared())
            .await
            .expect("launch on an empty queue must clear immediately");
    }

    #[tokio::test]
    async fn test_launch_blocks_behind_pending_cleanup() {
        let (guard, _rep) = guard();
        let parent = CancellationToken::new();
        let cleanup = guard.submit_cleanup(&parent, None).await;
        let launch = guard.submit_launch().await;

        assert!(
            time::timeout(BLOCK_WINDOW, launch.cleared()).await.is_err(),
            "launch must stay blocked while the cleanup is pending"
        );

        cleanup.mark_done();
        time::timeout(CLEAR_BOUND, launch.cleared())
            .await
            .expect("launch must clear promptly after mark_done");
    }

    #[tokio::test]
    async fn test_launch_waits_for_every_prior_cleanup() {
        let (guard, _rep) = guard();
        let parent = CancellationToken::new();
        let c1 = guard.submit_cleanup(&parent, None).await;
        let c2 = guard.submit_cleanup(&parent, None).await;
        let launch = guard.submit_launch().await;

        c1.mark_done();
        assert!(
            time::timeout(BLOCK_WINDOW, launch.cleared()).await.is_err(),
            "launch must stay blocked while any prior cleanup is pending"
        );

        c2.mark_done();
        time::timeout(CLEAR_BOUND, launch.cleared())
            .await
            .expect("launch must clear once all prior cleanups finished");
    }

    #[tokio::test]
    async fn test_fifo_across_kinds() {
        let (guard, _rep) = guard();
        let parent = CancellationToken::new();
        let c1 = guard.submit_cleanup(&parent, None).await;
        let l1 = guard.submit_launch().await;
        let c2 = guard.submit_cleanup(&parent, None).await;
        let l2 = guard.submit_launch().await;

        c1.mark_done();
        time::timeout(CLEAR_BOUND, l1.cleared())
            .await
            .expect("first launch clears after first cleanup");
        assert!(
            time::timeout(BLOCK_WINDOW, l2.cleared()).await.is_err(),
            "second launch must wait for the second cleanup"
        );

        c2.mark_done();
        time::timeout(CLEAR_BOUND, l2.cleared())
            .await
            .expect("second launch clears after second cleanup");
    }

    #[tokio::test]
    async fn test_depth_gauge_drains_to_zero() {
        let (guard, rep) = guard();
        let parent = CancellationToken::new();
        let c1 = guard.submit_cleanup(&parent, None).await;
        let c2 = guard.submit_cleanup(&parent, None).await;
        let c3 = guard.submit_cleanup(&parent, None).await;

        c1.mark_done();
        c2.mark_done();
        c3.mark_done();

        assert!(
            wait_until(
                || rep.gauges(names::DEPTH).last() == Some(&0),
                Duration::from_secs(2)
            )
            .await,
            "depth must drain to zero, got {:?}",
            rep.gauges(names::DEPTH)
        );
        assert_eq!(rep.gauges(names::DEPTH), vec![1, 2, 3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_idle_guard_refreshes_depth_each_tick() {
        let rep = Arc::new(RecordingReporter::default());
        let _guard = LaunchGuard::with_config(
            rep.clone(),
            GuardConfig {
                tick: Duration::from_millis(20),
                ..GuardConfig::default()
            },
        );

        assert!(
            wait_until(|| rep.gauges(names::DEPTH).len() >= 3, Duration::from_secs(2)).await,
            "idle guard must keep emitting the depth gauge"
        );
        assert!(rep.gauges(names::DEPTH).iter().all(|&d| d == 0));
    }

    #[tokio::test]
    async fn test_deadline_exceeded_cleanup_advances_queue_and_counts() {
        let (guard, rep) = guard();
        let parent = CancellationToken::new();
        // Never marked done; only the deadline unblocks the queue.
        let _c1 = guard
            .submit_cleanup(&parent, Some(Duration::from_millis(30)))
            .await;
        let launch = guard.submit_launch().await;

        time::timeout(Duration::from_secs(2), launch.cleared())
            .await
            .expect("deadline expiry must advance the queue");
        assert!(
            wait_until(
                || rep.counter_total(names::DEADLINE_EXCEEDED) == 1,
                Duration::from_secs(1)
            )
            .await,
            "overrun must be counted exactly once"
        );
    }

    #[tokio::test]
    async fn test_parent_cancel_unblocks_queue_like_mark_done() {
        let (guard, rep) = guard();
        let parent = CancellationToken::new();
        let _c1 = guard.submit_cleanup(&parent, None).await;
        let launch = guard.submit_launch().await;

        parent.cancel();
        time::timeout(CLEAR_BOUND, launch.cleared())
            .await
            .expect("parent cancellation must advance the queue");
        // Forced cancellation is not an overrun.
        assert_eq!(rep.counter_total(names::DEADLINE_EXCEEDED), 0);
    }

    #[tokio::test]
    async fn test_duplicate_mark_done_is_absorbed_by_the_queue() {
        let (guard, rep) = guard();
        let parent = CancellationToken::new();
        let c1 = guard.submit_cleanup(&parent, None).await;
        let launch = guard.submit_launch().await;

        c1.mark_done();
        c1.mark_done();
        time::timeout(CLEAR_BOUND, launch.cleared())
            .await
            .expect("queue advances once");
        assert_eq!(rep.timer_count(names::CLEANUP_TIME_IN_QUEUE), 1);
        assert_eq!(rep.timer_count(names::LAUNCH_TIME_IN_QUEUE), 1);
    }

    #[tokio::test]
    async fn test_dropped_guard_still_drains_queued_events() {
        let (guard, _rep) = guard();
        let parent = CancellationToken::new();
        let c1 = guard.submit_cleanup(&parent, None).await;
        let launch = guard.submit_launch().await;

        drop(guard);
        c1.mark_done();
        time::timeout(CLEAR_BOUND, launch.cleared())
            .await
            .expect("events accepted before drop must still drain");
    }

    #[tokio::test]
    async fn test_concurrent_submitters_all_get_serviced() {
        let (guard, _rep) = guard();
        let guard = Arc::new(guard);
        let parent = CancellationToken::new();

        let mut cleanups = Vec::new();
        for _ in 0..4 {
            let g = Arc::clone(&guard);
            let p = parent.clone();
            cleanups.push(tokio::spawn(
                async move { g.submit_cleanup(&p, None).await },
            ));
        }
        let mut handles = Vec::new();
        for h in cleanups {
            handles.push(h.await.unwrap());
        }

        let launch = guard.submit_launch().await;
        for c in &handles {
            c.mark_done();
        }
        time::timeout(Duration::from_secs(1), launch.cleared())
            .await
            .expect("launch clears after all concurrent cleanups finished");
    }
}
