//! # Recovery policies.
//!
//! A recovery policy decides, after every intercepted panic, whether the loop
//! body is restarted or the loop terminates.
//!
//! The policy receives the full history (the new panic already appended) and
//! returns either:
//! - `Ok(history)` → restart the body, keeping `history` (an empty history resets it);
//! - `Err(e)` → stop the loop with `e` as the terminal error.
//!
//! Any `Fn(Recoverings) -> Result<Recoverings, LoopError>` closure is a policy.
//! Ready-made policies: [`ignore`], [`limit`], [`limit_within`].
//!
//! ## Example
//! ```rust
//! use loopvisor::{LoopError, Recover, Recoverings};
//!
//! let policy = |rs: Recoverings| -> Result<Recoverings, LoopError> {
//!     if rs.len() >= 5 {
//!         return Err(LoopError::fatal("too many panics"));
//!     }
//!     Ok(rs)
//! };
//! assert!(policy.recover(Recoverings::new()).is_ok());
//! ```

use std::time::{Duration, SystemTime};

use crate::error::LoopError;

use super::recovering::Recoverings;

/// Decides how a loop reacts to an intercepted panic.
///
/// Policies run on the loop task between body invocations; they must not block.
/// A panicking policy terminates the loop with [`LoopError::PolicyPanicked`].
pub trait Recover: Send + Sync + 'static {
    /// Returns the history to keep and restart, or the terminal error.
    fn recover(&self, history: Recoverings) -> Result<Recoverings, LoopError>;
}

impl<F> Recover for F
where
    F: Fn(Recoverings) -> Result<Recoverings, LoopError> + Send + Sync + 'static,
{
    fn recover(&self, history: Recoverings) -> Result<Recoverings, LoopError> {
        (self)(history)
    }
}

/// Always restarts and discards the history.
pub fn ignore() -> impl Recover {
    |_rs: Recoverings| -> Result<Recoverings, LoopError> { Ok(Recoverings::new()) }
}

/// Restarts until the history holds `max` recoverings, then stops with
/// [`LoopError::TooManyRecoverings`].
///
/// The history is kept between restarts, so the counter never resets.
pub fn limit(max: usize) -> impl Recover {
    move |rs: Recoverings| check_limit(rs, max)
}

/// Like [`limit`], but only recoverings younger than `window` are counted;
/// older ones are dropped from the history.
pub fn limit_within(max: usize, window: Duration) -> impl Recover {
    move |rs: Recoverings| check_limit(rs.retain_within(window, SystemTime::now()), max)
}

fn check_limit(rs: Recoverings, max: usize) -> Result<Recoverings, LoopError> {
    if rs.len() >= max {
        return Err(LoopError::TooManyRecoverings { count: rs.len() });
    }
    Ok(rs)
}
