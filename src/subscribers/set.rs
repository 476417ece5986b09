//! # SubscriberSet: per-subscriber queues fed by the loop's bus.
//!
//! Each subscriber gets a bounded queue and a dedicated worker task. The
//! subscriber listener pushes bus events into every queue with `try_send`, so
//! a slow subscriber never holds up the loop or its siblings.
//!
//! ```text
//!  listener ─► emit(&Event) ─┬─► [queue] ─► worker ─► LogWriter::on_event()
//!                            └─► [queue] ─► worker ─► custom::on_event()
//! ```
//!
//! - Queue order is preserved per subscriber; nothing is ordered across them.
//! - A full or closed queue drops the event for that subscriber and reports
//!   `SubscriberOverflow` on the bus.
//! - A panic in `on_event` is caught in the worker and reported as
//!   `SubscriberPanicked`; the worker keeps serving its queue.
//! - Reports produced here are not fed back into the queues. Otherwise a
//!   subscriber that panics on every event would keep re-triggering itself.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event};
use crate::recovery::panic_message;

use super::Subscribe;

struct Slot {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
}

pub(crate) struct SubscriberSet {
    slots: Vec<Slot>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must be called inside a tokio runtime.
    pub(crate) fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (slots, workers): (Vec<Slot>, Vec<JoinHandle<()>>) = subs
            .into_iter()
            .map(|sub| {
                let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let slot = Slot {
                    name: sub.name(),
                    queue,
                };
                (slot, tokio::spawn(serve(sub, rx, bus.clone())))
            })
            .unzip();

        Self {
            slots,
            workers,
            bus,
        }
    }

    /// Queues `event` for every subscriber without waiting on any of them.
    ///
    /// Subscriber reports (`SubscriberPanicked`, `SubscriberOverflow`) are
    /// skipped; they stay visible through `Loop::subscribe()`.
    pub(crate) fn emit(&self, event: &Event) {
        if event.is_subscriber_report() {
            return;
        }

        let ev = Arc::new(event.clone());
        for slot in &self.slots {
            let reason = match slot.queue.try_send(Arc::clone(&ev)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            eprintln!("[loopvisor] subscriber '{}' dropped event: {reason}", slot.name);
            self.bus.publish(Event::subscriber_overflow(slot.name, reason));
        }
    }

    /// Closes every queue and waits for the workers to drain them.
    pub(crate) async fn shutdown(self) {
        drop(self.slots);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn serve(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let Err(payload) = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await else {
            continue;
        };
        let info = panic_message(&*payload).unwrap_or("unknown panic").to_string();
        eprintln!("[loopvisor] subscriber '{}' panicked: {info}", sub.name());
        bus.publish(Event::subscriber_panicked(sub.name(), info));
    }
}
