//! Loop core: lifecycle and supervision.
//!
//! The public API from this module is [`Loop`] (the caller's handle),
//! [`LoopBuilder`], [`LoopConfig`], [`Control`] (the body's handle) and [`Status`].
//!
//! Internal modules:
//! - [`state`]: shared status/error pair, kill reason and stop signal;
//! - [`runner`]: drives the body on the loop task, intercepts panics, applies recovery;
//! - [`builder`]: wires bus, subscribers and runner together;
//! - [`handle`]: stop/kill/wait/error on the caller side.

mod builder;
mod config;
mod control;
mod handle;
mod runner;
mod state;

#[cfg(test)]
mod tests;

pub use builder::LoopBuilder;
pub use config::LoopConfig;
pub use control::Control;
pub use handle::Loop;
pub use state::Status;
