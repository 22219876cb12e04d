//! Runtime core: the serialized queue and its state machine.
//!
//! This module contains the embedded implementation of the guard runtime.
//! The public API from this module is [`LaunchGuard`], which owns the
//! submission channel and the spawned run loop, and [`GuardState`], the
//! three-state classification the loop moves through.
//!
//! Internal modules:
//! - [`guard`]: queue ownership, blocking handoff, and the run loop.

mod guard;

pub use guard::{GuardState, LaunchGuard};
