//! # launchguard
//!
//! **launchguard** is an in-process coordination primitive for node-local
//! container executors: a single serialized event queue with an explicit
//! state machine that orders concurrent container *launch* and *cleanup*
//! requests contending for node-level resource slots (network namespaces,
//! IP allocations, cgroup paths, mount points).
//!
//! Launching a container while a prior container's cleanup for the same
//! slot is still in flight leaks resources or conflicts allocations. The
//! guard holds every launch back until every cleanup accepted before it
//! has finished — nothing more: it decides *when* a launch may proceed,
//! never *what* to clean up or *how* to launch.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  stop path (N tasks)              start path (N tasks)
//!       │                                 │
//!       │ submit_cleanup()                │ submit_launch()
//!       │   (blocking handoff)            │   (blocking handoff)
//!       ▼                                 ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  LaunchGuard run loop (one task, exclusive queue owner)   │
//! │                                                           │
//! │   VecDeque<GuardEvent>   [C1][C2][L1][C3][L2] ◄─ tail     │
//! │          head ─┘                                          │
//! │                                                           │
//! │   state = f(head):                                        │
//! │     Empty ── cleanup ──► WaitingOnCleanup ◄─┐             │
//! │       │                        │ head done  │ re-derive   │
//! │       └── launch ──► DoLaunch ◄┘────────────┘             │
//! │                                                           │
//! │   every iteration: Reporter::gauge(depth)                 │
//! │   15s tick: wake with no queue effect (gauge refresh)     │
//! └───────────────────────────────────────────────────────────┘
//!       │                                 │
//!       ▼                                 ▼
//!  CleanupEvent.mark_done()          LaunchEvent.cleared().await
//!  (owner finishes teardown)         (owner blocks until safe)
//! ```
//!
//! ### Ordering guarantees
//! Global FIFO across both event kinds by handoff acceptance order. A launch
//! receives clearance only after every event accepted before it has either
//! completed (cleanup) or been cleared and popped (launch). Only the head of
//! the queue is ever examined; nothing jumps the queue.
//!
//! ## Features
//! | Area          | Description                                                | Key types                         |
//! |---------------|------------------------------------------------------------|-----------------------------------|
//! | **Guard**     | Serialized queue + state machine, spawned on construction. | [`LaunchGuard`], [`GuardState`]   |
//! | **Events**    | Cleanup/launch handles, real and no-op variants.           | [`CleanupEvent`], [`LaunchEvent`] |
//! | **Metrics**   | Depth gauge, time-in-queue timers, overrun counter.        | [`Reporter`], [`NoopReporter`]    |
//! | **Errors**    | Fatal invariant violations of the run loop.                | [`GuardError`]                    |
//! | **Config**    | Tick interval and handoff channel capacity.                | [`GuardConfig`]                   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogReporter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use launchguard::{LaunchGuard, NoopReporter};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let guard = LaunchGuard::new(Arc::new(NoopReporter));
//!     let shutdown = CancellationToken::new();
//!
//!     // Stop path: claim the slot, tear down, then release.
//!     let cleanup = guard
//!         .submit_cleanup(&shutdown, Some(Duration::from_secs(30)))
//!         .await;
//!     let teardown = tokio::spawn(async move {
//!         // ... stop container, release IP, unmount ...
//!         cleanup.mark_done();
//!     });
//!
//!     // Start path: blocks until the teardown above has finished.
//!     let launch = guard.submit_launch().await;
//!     launch.cleared().await;
//!     // ... safe to start the container now ...
//!     teardown.await.unwrap();
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod metrics;

// ---- Public re-exports ----

pub use config::GuardConfig;
pub use core::{GuardState, LaunchGuard};
pub use error::GuardError;
pub use events::{CleanupEvent, LaunchEvent};
pub use metrics::{NoopReporter, Reporter, names};

// Optional: expose a simple built-in metrics-to-log reporter (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use metrics::LogReporter;
