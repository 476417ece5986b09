//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [starting] loop="worker" attempt=1
//! [panicked] loop="worker" reason="ouch" attempt=1 recoverings=1
//! [restart] loop="worker" delay_ms=0 after_attempt=1 recoverings=1
//! [declined] loop="worker" err="too many recoverings: 5" attempt=5
//! [stop-requested] loop="worker" reason=None
//! [stopped] loop="worker" err=None attempt=1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::LoopStarting => {
                println!("[starting] loop={:?} attempt={:?}", e.name, e.attempt);
            }
            EventKind::StopRequested => {
                println!("[stop-requested] loop={:?} reason={:?}", e.name, e.reason);
            }
            EventKind::LoopStopped => {
                println!(
                    "[stopped] loop={:?} err={:?} attempt={:?}",
                    e.name, e.reason, e.attempt
                );
            }
            EventKind::BodyPanicked => {
                println!(
                    "[panicked] loop={:?} reason={:?} attempt={:?} recoverings={:?}",
                    e.name, e.reason, e.attempt, e.recoverings
                );
            }
            EventKind::RecoveryDeclined => {
                println!(
                    "[declined] loop={:?} err={:?} attempt={:?}",
                    e.name, e.reason, e.attempt
                );
            }
            EventKind::RestartScheduled => {
                println!(
                    "[restart] loop={:?} delay_ms={:?} after_attempt={:?} recoverings={:?}",
                    e.name, e.delay_ms, e.attempt, e.recoverings
                );
            }
            // Never queued to subscribers; the set already wrote them to stderr.
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {}
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
