use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::{
    bodies::{BodyFn, BodyRef},
    core::{
        Control, LoopConfig,
        handle::Loop,
        runner::Runner,
        state::{Shared, Status},
    },
    error::LoopError,
    events::{Bus, EventKind},
    recovery::Recover,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a supervised loop with optional recovery and subscribers.
pub struct LoopBuilder {
    cfg: LoopConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    recovery: Option<Arc<dyn Recover>>,
}

impl LoopBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: LoopConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            recovery: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive loop events through dedicated workers with bounded queues.
    /// The workers shut down after the loop's `LoopStopped` event.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Intercepts body panics and consults `policy` before restarting the body.
    ///
    /// Without a policy a panicking body crashes the loop.
    pub fn with_recovery<R: Recover>(mut self, policy: R) -> Self {
        self.recovery = Some(Arc::new(policy));
        self
    }

    /// Spawns the loop running the closure `f`.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F, Fut>(self, f: F) -> Loop
    where
        F: Fn(Control) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), LoopError>> + Send + 'static,
    {
        self.spawn_body(BodyFn::arc(f))
    }

    /// Spawns the loop running `body`.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn_body(self, body: BodyRef) -> Loop {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let shared = Arc::new(Shared::new(Arc::from(self.cfg.name.as_ref()), bus.clone()));

        if !self.subscribers.is_empty() {
            subscriber_listener(&shared, SubscriberSet::new(self.subscribers, bus.clone()));
        }

        let runner = Runner {
            shared: Arc::clone(&shared),
            body,
            recovery: self.recovery,
            restart_delay: self.cfg.restart_delay,
        };
        tokio::spawn(runner.run());

        Loop::from_shared(shared)
    }
}

/// Forwards bus events to the subscriber set until the loop has stopped.
fn subscriber_listener(shared: &Arc<Shared>, set: SubscriberSet) {
    let mut rx = shared.bus.subscribe();
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    set.emit(&ev);
                    if ev.kind == EventKind::LoopStopped {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    eprintln!("[loopvisor] subscriber listener lagged, skipped {n} events");
                    if shared.snapshot().0 == Status::Stopped && rx.is_empty() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    });
}
