//! Error types used by the launchguard runtime.
//!
//! There is exactly one error enum here, [`GuardError`], and it is
//! deliberately small: the guard performs no I/O, so every internal failure
//! is either absorbed by idempotent event semantics or is an invariant
//! violation that terminates the run loop. There is no intermediate
//! "retryable" tier.

use thiserror::Error;

use crate::core::GuardState;

/// # Errors produced by the guard run loop.
///
/// These are fatal: the run loop stops when it returns one of these, because
/// each indicates a broken invariant elsewhere in the process, not a
/// recoverable runtime condition.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GuardError {
    /// The state machine and the queue disagree: the loop is in a state whose
    /// preconditions the queue head does not satisfy (e.g. waiting on a
    /// cleanup while the head is a launch, or the queue is empty).
    #[error("guard invariant violated in state {state:?}: {detail}")]
    InvariantViolation {
        /// State the loop was in when the mismatch was observed.
        state: GuardState,
        /// What the queue head actually looked like.
        detail: &'static str,
    },
}

impl GuardError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            GuardError::InvariantViolation { .. } => "guard_invariant_violation",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            GuardError::InvariantViolation { state, detail } => {
                format!("invariant violated in state {state:?}: {detail}")
            }
        }
    }
}
