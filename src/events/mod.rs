//! Guard events: the two request kinds the queue carries.
//!
//! This module groups the event **data model**: cleanup events (container
//! teardown claimed a resource slot) and launch events (a new container wants
//! a slot and awaits clearance). Each kind ships a *real* variant that
//! participates in coordination and a *no-op* variant that is always already
//! complete, for call sites where no ordering constraint exists.
//!
//! ## Contents
//! - [`CleanupEvent`] — teardown in flight; owner calls `mark_done()`
//! - [`LaunchEvent`] — start pending; owner awaits `cleared()`
//! - [`GuardEvent`] — closed sum of the two, as stored in the queue
//!
//! ## Quick reference
//! - **Producers**: the executor's stop path (`submit_cleanup`) and start
//!   path (`submit_launch`) on [`LaunchGuard`](crate::LaunchGuard).
//! - **Consumer**: the guard run loop, which waits on the head event only.

mod cleanup;
mod launch;

pub use cleanup::CleanupEvent;
pub use launch::LaunchEvent;

/// An entry in the guard queue: exactly one of the two recognized kinds.
///
/// The tag space is closed by construction; state derivation in the run loop
/// pattern-matches exhaustively, so an unrecognized kind cannot exist.
#[derive(Clone)]
pub(crate) enum GuardEvent {
    /// Teardown in flight; blocks everything queued behind it.
    Cleanup(CleanupEvent),
    /// Start pending; granted clearance when it reaches the head.
    Launch(LaunchEvent),
}

impl GuardEvent {
    /// Short kind label for logs.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            GuardEvent::Cleanup(_) => "cleanup",
            GuardEvent::Launch(_) => "launch",
        }
    }
}
