//! # Loop: handle to one supervised execution.
//!
//! [`Loop`] is what callers hold after starting a body. It requests graceful
//! stops, kills with a reason, waits for completion and reads the committed
//! outcome without blocking.
//!
//! ## Outcome precedence
//! ```text
//! policy error  >  body error  >  kill reason  >  none
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use loopvisor::{Control, Loop, LoopError, Status};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let l = Loop::go(|ctl: Control| async move {
//!         loop {
//!             tokio::select! {
//!                 _ = ctl.shall_stop() => return Ok(()),
//!                 _ = tokio::time::sleep(Duration::from_millis(5)) => { /* tick */ }
//!             }
//!         }
//!     });
//!
//!     assert_eq!(l.kill(LoopError::fail("ouch")).await, Err(LoopError::fail("ouch")));
//!     assert_eq!(l.status(), Status::Stopped);
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    core::{
        Control, LoopBuilder, LoopConfig,
        state::{Shared, Status},
    },
    error::LoopError,
    events::Event,
    recovery::Recover,
};

/// Handle to a supervised loop.
///
/// Cloning is cheap; all clones control the same loop. Dropping every handle
/// does not stop the loop, it keeps running detached.
#[derive(Clone)]
pub struct Loop {
    shared: Arc<Shared>,
}

impl Loop {
    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Starts `f` on a new tokio task; a panic in `f` crashes the loop.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn go<F, Fut>(f: F) -> Self
    where
        F: Fn(Control) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), LoopError>> + Send + 'static,
    {
        LoopBuilder::new(LoopConfig::default()).spawn(f)
    }

    /// Starts `f` on a new tokio task, restarting it after panics as `policy` allows.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn go_recoverable<F, Fut, R>(f: F, policy: R) -> Self
    where
        F: Fn(Control) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), LoopError>> + Send + 'static,
        R: Recover,
    {
        LoopBuilder::new(LoopConfig::default())
            .with_recovery(policy)
            .spawn(f)
    }

    /// Returns a builder for a loop with custom config, recovery and subscribers.
    pub fn builder(cfg: LoopConfig) -> LoopBuilder {
        LoopBuilder::new(cfg)
    }

    /// Loop name from its config.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Requests a graceful stop and waits until the body has returned.
    ///
    /// Returns the committed terminal error. Safe to call from many callers and
    /// repeatedly; all of them observe the same outcome.
    pub async fn stop(&self) -> Result<(), LoopError> {
        self.shared.request_stop(None);
        self.wait().await
    }

    /// Like [`stop`](Self::stop), with `reason` as the terminal error unless the
    /// body (or the recovery policy) produces its own.
    ///
    /// Only the first kill reason is kept.
    pub async fn kill(&self, reason: impl Into<LoopError>) -> Result<(), LoopError> {
        self.shared.request_stop(Some(reason.into()));
        self.wait().await
    }

    /// Waits for the loop to stop without requesting it.
    pub async fn wait(&self) -> Result<(), LoopError> {
        let mut rx = self.shared.subscribe();
        match rx.wait_for(|s| s.status == Status::Stopped).await {
            Ok(state) => match &state.error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            },
            // The sender lives in `shared`, which `self` keeps alive.
            Err(_) => Err(LoopError::Aborted),
        }
    }

    /// Current status and, once `Stopped`, the terminal error.
    ///
    /// Never blocks. Before `Stopped` the error is always `None`.
    pub fn error(&self) -> (Status, Option<LoopError>) {
        self.shared.snapshot()
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.shared.snapshot().0
    }

    /// Receiver for this loop's events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }
}

impl std::fmt::Debug for Loop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (status, error) = self.error();
        f.debug_struct("Loop")
            .field("name", &self.name())
            .field("status", &status)
            .field("error", &error)
            .finish()
    }
}
