//! # Shared loop state.
//!
//! The only state shared between the loop task and its callers:
//! - the committed `(Status, error)` pair plus a pending kill reason, held in a
//!   [`watch`] channel so every reader sees a whole snapshot;
//! - the stop signal ([`CancellationToken`]);
//! - the event [`Bus`].
//!
//! ## Transitions
//! ```text
//! Running ──stop/kill──► Stopping ──body returned──► Stopped
//!    └────────────body returned on its own──────────────┘
//! ```
//! `Stopped` is terminal: the error is written exactly once, together with the
//! status flip, under the channel's lock.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::LoopError;
use crate::events::{Bus, Event, EventKind};

/// Externally visible lifecycle state of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Body is running (restarts after recovered panics keep this status).
    Running,
    /// A stop or kill was requested; the body has not returned yet.
    Stopping,
    /// Body returned for good; the terminal error is committed.
    Stopped,
}

impl Status {
    /// Returns a short stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Running => "running",
            Status::Stopping => "stopping",
            Status::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct State {
    pub(crate) status: Status,
    pub(crate) error: Option<LoopError>,
    kill: Option<LoopError>,
}

pub(crate) struct Shared {
    pub(crate) name: Arc<str>,
    pub(crate) token: CancellationToken,
    pub(crate) bus: Bus,
    state: watch::Sender<State>,
}

impl Shared {
    pub(crate) fn new(name: Arc<str>, bus: Bus) -> Self {
        let (state, _rx) = watch::channel(State {
            status: Status::Running,
            error: None,
            kill: None,
        });
        Self {
            name,
            token: CancellationToken::new(),
            bus,
            state,
        }
    }

    /// Consistent `(status, error)` snapshot; the error is `None` until `Stopped`.
    pub(crate) fn snapshot(&self) -> (Status, Option<LoopError>) {
        let s = self.state.borrow();
        (s.status, s.error.clone())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Records a stop request and fires the stop signal.
    ///
    /// The first kill reason is kept; later reasons and requests after
    /// `Stopped` are ignored.
    pub(crate) fn request_stop(&self, reason: Option<LoopError>) {
        let mut first = false;
        self.state.send_if_modified(|s| {
            if s.status == Status::Stopped {
                return false;
            }
            let mut modified = false;
            if s.status == Status::Running {
                s.status = Status::Stopping;
                first = true;
                modified = true;
            }
            if s.kill.is_none() && reason.is_some() {
                s.kill = reason.clone();
                modified = true;
            }
            modified
        });
        self.token.cancel();

        if first {
            let mut ev = Event::new(EventKind::StopRequested).with_loop(self.name.clone());
            if let Some(reason) = &reason {
                ev = ev.with_reason(reason.to_string());
            }
            self.bus.publish(ev);
        }
    }

    /// Commits the terminal state and returns the committed error.
    ///
    /// An error from the body (or policy) wins over a pending kill reason.
    /// A second commit is ignored.
    pub(crate) fn commit(&self, outcome: Result<(), LoopError>) -> Option<LoopError> {
        let mut committed = None;
        self.state.send_if_modified(|s| {
            if s.status == Status::Stopped {
                committed = s.error.clone();
                return false;
            }
            s.error = match outcome {
                Err(e) => Some(e),
                Ok(()) => s.kill.take(),
            };
            s.status = Status::Stopped;
            committed = s.error.clone();
            true
        });
        committed
    }
}
