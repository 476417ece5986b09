//! # Loop runner: drives one supervised loop to its terminal state.
//!
//! The runner is the body of the loop's tokio task. It invokes the body, applies
//! the recovery policy after intercepted panics, and commits the terminal
//! `(Stopped, error)` pair exactly once.
//!
//! ## Flow
//! ```text
//! plain loop:
//!   body.spawn(ctl) ─► Ok/Err                   ─► commit
//!                   └► panic ─► commit(Crashed) ─► resume unwinding
//!
//! recovering loop:
//! loop {
//!   ├─► attempt += 1, publish LoopStarting
//!   ├─► body.spawn(ctl) (panics caught)
//!   │       ├─ Ok/Err  ─► commit, exit (even if no stop was requested)
//!   │       └─ panic   ─► history.push(Recovering), publish BodyPanicked
//!   ├─► policy.recover(history) (panics caught)
//!   │       ├─ Err(e)  ─► publish RecoveryDeclined, commit(Err(e)), exit
//!   │       └─ Ok(h)   ─► history = h
//!   ├─► stop requested? ─► commit(Ok), exit
//!   └─► publish RestartScheduled, sleep(restart delay) (cancellable)
//! }
//! ```
//!
//! ## Rules
//! - Invocations run **sequentially** on the loop task, never concurrently.
//! - The history lives on the loop task only.
//! - If the task is dropped before committing (runtime shutdown), the loop is
//!   committed as [`LoopError::Aborted`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::{select, time};

use crate::{
    bodies::BodyRef,
    core::{control::Control, state::Shared},
    error::LoopError,
    events::{Event, EventKind},
    policies::BackoffPolicy,
    recovery::{Reason, Recover, Recovering, Recoverings, panic_message},
};

/// Everything the loop task owns.
pub(crate) struct Runner {
    pub(crate) shared: Arc<Shared>,
    pub(crate) body: BodyRef,
    pub(crate) recovery: Option<Arc<dyn Recover>>,
    pub(crate) restart_delay: Option<BackoffPolicy>,
}

/// Commits `Aborted` if the runner future is dropped before it finished.
struct CommitGuard {
    shared: Arc<Shared>,
    armed: bool,
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        if self.armed {
            finish(&self.shared, Err(LoopError::Aborted), None);
        }
    }
}

impl Runner {
    /// Returns the loop task's future; it runs until the terminal state is committed.
    ///
    /// The commit guard is armed before the first poll, so a task dropped
    /// without ever running still commits `Aborted`.
    pub(crate) fn run(self) -> impl Future<Output = ()> + Send + 'static {
        let mut guard = CommitGuard {
            shared: Arc::clone(&self.shared),
            armed: true,
        };

        async move {
            let mut attempt: u32 = 0;
            let outcome = match &self.recovery {
                Some(policy) => self.run_recoverable(policy.as_ref(), &mut attempt).await,
                None => self.run_plain(&mut attempt, &mut guard).await,
            };

            guard.armed = false;
            finish(&self.shared, outcome, Some(attempt));
        }
    }

    /// Single invocation without interception.
    ///
    /// A panic crashes the loop: the state is committed as [`LoopError::Crashed`]
    /// and the panic continues unwinding into the loop's task.
    async fn run_plain(&self, attempt: &mut u32, guard: &mut CommitGuard) -> Result<(), LoopError> {
        *attempt = 1;
        self.publish_starting(*attempt);

        let ctl = self.control(*attempt);
        let body = &self.body;
        match AssertUnwindSafe(async move { body.spawn(ctl).await })
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => {
                guard.armed = false;
                finish(&self.shared, Err(LoopError::Crashed), Some(*attempt));
                std::panic::resume_unwind(payload)
            }
        }
    }

    async fn run_recoverable(&self, policy: &dyn Recover, attempt: &mut u32) -> Result<(), LoopError> {
        let mut history = Recoverings::new();
        let mut restarts: u32 = 0;

        loop {
            *attempt = attempt.saturating_add(1);
            self.publish_starting(*attempt);

            let ctl = self.control(*attempt);
            let body = &self.body;
            let payload = match AssertUnwindSafe(async move { body.spawn(ctl).await })
                .catch_unwind()
                .await
            {
                Ok(outcome) => return outcome,
                Err(payload) => payload,
            };

            let reason = Reason::new(payload);
            self.shared.bus.publish(
                Event::new(EventKind::BodyPanicked)
                    .with_loop(self.shared.name.clone())
                    .with_attempt(*attempt)
                    .with_reason(reason.to_string())
                    .with_recoverings(history.len() + 1),
            );
            history.push(Recovering::now(reason));

            history = match std::panic::catch_unwind(AssertUnwindSafe(|| policy.recover(history))) {
                Ok(Ok(kept)) => kept,
                Ok(Err(err)) => return Err(self.declined(err, *attempt)),
                Err(payload) => {
                    let err = LoopError::PolicyPanicked {
                        reason: panic_message(&*payload)
                            .unwrap_or("opaque panic payload")
                            .to_string(),
                    };
                    return Err(self.declined(err, *attempt));
                }
            };

            if self.shared.token.is_cancelled() {
                return Ok(());
            }

            let delay = self
                .restart_delay
                .map_or(Duration::ZERO, |backoff| backoff.delay(restarts));
            restarts = restarts.saturating_add(1);
            self.shared.bus.publish(
                Event::new(EventKind::RestartScheduled)
                    .with_loop(self.shared.name.clone())
                    .with_attempt(*attempt)
                    .with_delay(delay)
                    .with_recoverings(history.len()),
            );

            if !delay.is_zero() {
                let sleep = time::sleep(delay);
                tokio::pin!(sleep);
                select! {
                    _ = &mut sleep => {}
                    _ = self.shared.token.cancelled() => return Ok(()),
                }
            }
        }
    }

    fn control(&self, attempt: u32) -> Control {
        Control::new(self.shared.token.clone(), self.shared.name.clone(), attempt)
    }

    fn publish_starting(&self, attempt: u32) {
        self.shared.bus.publish(
            Event::new(EventKind::LoopStarting)
                .with_loop(self.shared.name.clone())
                .with_attempt(attempt),
        );
    }

    fn declined(&self, err: LoopError, attempt: u32) -> LoopError {
        self.shared.bus.publish(
            Event::new(EventKind::RecoveryDeclined)
                .with_loop(self.shared.name.clone())
                .with_attempt(attempt)
                .with_reason(err.to_string()),
        );
        err
    }
}

/// Commits the terminal state and publishes `LoopStopped`.
fn finish(shared: &Shared, outcome: Result<(), LoopError>, attempt: Option<u32>) {
    let committed = shared.commit(outcome);

    let mut ev = Event::new(EventKind::LoopStopped).with_loop(shared.name.clone());
    if let Some(attempt) = attempt {
        ev = ev.with_attempt(attempt);
    }
    if let Some(err) = committed {
        ev = ev.with_reason(err.to_string());
    }
    shared.bus.publish(ev);
}
