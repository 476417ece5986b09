//! # Runtime events emitted by supervised loops.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: body execution flow (starting, stop requested, stopped)
//! - **Recovery events**: panics caught, restarts scheduled, policy refusals
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, loop name,
//! reasons, attempt counters and restart delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use loopvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BodyPanicked)
//!     .with_loop("worker")
//!     .with_reason("ouch")
//!     .with_attempt(3)
//!     .with_recoverings(3);
//!
//! assert_eq!(ev.kind, EventKind::BodyPanicked);
//! assert_eq!(ev.name.as_deref(), Some("worker"));
//! assert_eq!(ev.reason.as_deref(), Some("ouch"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `name`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `name`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Loop lifecycle events ===
    /// Body invocation is starting.
    ///
    /// Sets:
    /// - `name`: loop name
    /// - `attempt`: invocation number (1-based, grows on every restart)
    LoopStarting,

    /// A caller requested a stop (first request only).
    ///
    /// Sets:
    /// - `name`: loop name
    /// - `reason`: kill reason, absent for a plain stop
    StopRequested,

    /// Loop reached its terminal state.
    ///
    /// Sets:
    /// - `name`: loop name
    /// - `attempt`: last invocation number
    /// - `reason`: terminal error, absent on clean completion
    LoopStopped,

    // === Recovery events ===
    /// Body panicked and the panic was intercepted by the recovery controller.
    ///
    /// Sets:
    /// - `name`: loop name
    /// - `attempt`: invocation that panicked
    /// - `reason`: panic message (or a placeholder for opaque payloads)
    /// - `recoverings`: history length handed to the policy
    BodyPanicked,

    /// Recovery policy refused a restart.
    ///
    /// Sets:
    /// - `name`: loop name
    /// - `attempt`: invocation that panicked
    /// - `reason`: error returned by the policy
    RecoveryDeclined,

    /// Next invocation scheduled after a recovered panic.
    ///
    /// Sets:
    /// - `name`: loop name
    /// - `attempt`: invocation that panicked
    /// - `delay_ms`: delay before the next invocation (ms, `0` = immediate)
    /// - `recoverings`: history length kept by the policy
    RestartScheduled,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Restart delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, panic messages, overflow details).
    pub reason: Option<Arc<str>>,
    /// Invocation count (starting from 1).
    pub attempt: Option<u32>,
    /// Recovery history length at the time of the event.
    pub recoverings: Option<u32>,
    /// Name of the loop (or subscriber, for subscriber events).
    pub name: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            attempt: None,
            reason: None,
            delay_ms: None,
            recoverings: None,
            name: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a loop name.
    #[inline]
    pub fn with_loop(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a restart delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an invocation count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a recovery history length.
    #[inline]
    pub fn with_recoverings(mut self, n: usize) -> Self {
        self.recoverings = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_loop(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_loop(subscriber)
            .with_reason(info)
    }

    /// True for events emitted by subscriber workers about themselves.
    #[inline]
    pub(crate) fn is_subscriber_report(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
