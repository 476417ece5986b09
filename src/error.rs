//! Error types used by supervised loops.
//!
//! [`LoopError`] is the single terminal error type: it is what a loop body
//! returns, what a kill request carries, and what a recovery policy hands back
//! when it refuses to restart the body.
//!
//! Helper methods (`as_label`, `as_message`) exist for logging/metrics.

use thiserror::Error;

/// # Errors produced by a supervised loop.
///
/// Precedence when a loop terminates:
/// policy-declared error > body-returned error > kill reason > none.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoopError {
    /// Body failed (or a caller killed the loop with an ad-hoc reason).
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable failure reported by the body or a policy.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// A limiting recovery policy saw too many panics.
    #[error("too many recoverings: {count}")]
    TooManyRecoverings {
        /// Number of recorded recoverings when the policy gave up.
        count: usize,
    },

    /// The recovery policy itself panicked.
    #[error("recovery policy panicked: {reason}")]
    PolicyPanicked {
        /// Panic message of the policy, if it was readable.
        reason: String,
    },

    /// The body panicked and no recovery policy was installed.
    #[error("loop crashed: unrecovered panic")]
    Crashed,

    /// The loop task was dropped before the body finished (runtime shut down).
    #[error("loop aborted before completion")]
    Aborted,
}

impl LoopError {
    /// Shorthand for [`LoopError::Fail`].
    ///
    /// # Example
    /// ```
    /// use loopvisor::LoopError;
    ///
    /// let err = LoopError::fail("ouch");
    /// assert_eq!(err.to_string(), "execution failed: ouch");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        LoopError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`LoopError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        LoopError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use loopvisor::LoopError;
    ///
    /// assert_eq!(LoopError::Crashed.as_label(), "loop_crashed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LoopError::Fail { .. } => "loop_failed",
            LoopError::Fatal { .. } => "loop_fatal",
            LoopError::TooManyRecoverings { .. } => "loop_too_many_recoverings",
            LoopError::PolicyPanicked { .. } => "loop_policy_panicked",
            LoopError::Crashed => "loop_crashed",
            LoopError::Aborted => "loop_aborted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LoopError::Fail { error } => format!("error: {error}"),
            LoopError::Fatal { error } => format!("fatal: {error}"),
            LoopError::TooManyRecoverings { count } => format!("recoverings: {count}"),
            LoopError::PolicyPanicked { reason } => format!("policy panic: {reason}"),
            LoopError::Crashed => "unrecovered panic".to_string(),
            LoopError::Aborted => "aborted".to_string(),
        }
    }

    /// Returns the inner message of `Fail`/`Fatal` errors.
    ///
    /// Handy for policies that match on a specific failure text.
    pub fn message(&self) -> Option<&str> {
        match self {
            LoopError::Fail { error } | LoopError::Fatal { error } => Some(error),
            _ => None,
        }
    }
}

impl From<&str> for LoopError {
    fn from(error: &str) -> Self {
        LoopError::fail(error)
    }
}

impl From<String> for LoopError {
    fn from(error: String) -> Self {
        LoopError::fail(error)
    }
}
