//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by a loop's task and by the
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the loop handle (stop requests), the loop runner (lifecycle
//!   and recovery events), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by `LoopBuilder` (fans out to
//!   `SubscriberSet`) and anyone holding `Loop::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
