//! # Control handle passed to loop bodies.
//!
//! [`Control`] is the body's view of its loop: the one-shot stop signal plus a
//! little context (loop name, invocation number).
//!
//! The stop signal is a [`CancellationToken`]: it fires on the first `stop` or
//! `kill`, never resets, and stays observable for every later check, including
//! checks made by bodies restarted after a panic.

use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Handle through which a body observes stop requests.
#[derive(Clone, Debug)]
pub struct Control {
    token: CancellationToken,
    name: Arc<str>,
    attempt: u32,
}

impl Control {
    pub(crate) fn new(token: CancellationToken, name: Arc<str>, attempt: u32) -> Self {
        Self {
            token,
            name,
            attempt,
        }
    }

    /// Resolves once a stop or kill has been requested; resolves immediately afterwards.
    ///
    /// Meant for `tokio::select!` next to the body's own work:
    /// ```rust
    /// # use loopvisor::{Control, LoopError};
    /// # async fn body(ctl: Control, mut rx: tokio::sync::mpsc::Receiver<String>) -> Result<(), LoopError> {
    /// loop {
    ///     tokio::select! {
    ///         _ = ctl.shall_stop() => return Ok(()),
    ///         Some(line) = rx.recv() => println!("{line}"),
    ///     }
    /// }
    /// # }
    /// ```
    pub fn shall_stop(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Non-blocking check of the stop signal.
    pub fn is_stopping(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Loop name from [`LoopConfig::name`](crate::LoopConfig::name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invocation number, starting at 1 and growing with every restart.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Child token for nested work that must stop together with the loop.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
