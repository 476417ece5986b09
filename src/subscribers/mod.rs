//! # Event subscribers for loops.
//!
//! ## Architecture
//! ```text
//! Runner ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet::emit(&Event)
//!                                                                ├─► [queue] ─► worker ─► LogWriter
//!                                                                └─► [queue] ─► worker ─► custom
//! ```
//!
//! - [`Subscribe`] the extension point
//! - `SubscriberSet` per-subscriber queues and workers (crate-internal)
//! - `LogWriter` stdout printer (feature `logging`)

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::SubscriberSet;
pub use subscriber::Subscribe;
