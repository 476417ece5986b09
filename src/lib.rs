//! # loopvisor
//!
//! **Loopvisor** runs a unit of async work under supervision: the work runs on
//! its own tokio task, the caller keeps a [`Loop`] handle to stop or kill it,
//! the final outcome can be polled without blocking, and panics can optionally
//! be recovered from under a caller-supplied policy.
//!
//! It is a building block: one supervised loop and its recovery policy, from
//! which larger supervisors can be composed.
//!
//! ## Architecture
//! ```text
//!   caller                                    loop task (tokio::spawn)
//! ┌───────────────────┐                    ┌──────────────────────────────┐
//! │ Loop              │  stop / kill       │ Runner                       │
//! │  - stop()   ──────┼──► CancellationTok─┼─► Control::shall_stop()      │
//! │  - kill(e)        │                    │  - body.spawn(ctl)           │
//! │  - wait()   ◄─────┼── watch<State> ◄───┼─ commit(Stopped, error)      │
//! │  - error()        │                    │  - panics ─► Recoverings     │
//! │  - subscribe() ◄──┼──── Bus ◄──────────┼─   └─► Recover::recover()    │
//! └───────────────────┘         │          └──────────────────────────────┘
//!                               ▼
//!                       SubscriberSet ─► Subscribe::on_event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! Running ──stop/kill──► Stopping ──body returned──► Stopped
//!    └──────────────body returned on its own─────────────┘
//! ```
//! Restarts after recovered panics happen while the status stays `Running`.
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                      |
//! |-------------------|-----------------------------------------------------------|-----------------------------------------|
//! | **Loops**         | Start, stop, kill, wait and poll a supervised body.       | [`Loop`], [`Control`], [`Status`]       |
//! | **Recovery**      | Catch panics, keep a history, let a policy decide.        | [`Recover`], [`Recoverings`]            |
//! | **Pacing**        | Optional delay between restarts.                          | [`BackoffPolicy`], [`JitterPolicy`]     |
//! | **Subscriber API**| Hook into loop lifecycle events.                          | [`Subscribe`], [`Event`]                |
//! | **Errors**        | One typed terminal error.                                 | [`LoopError`]                           |
//! | **Configuration** | Name, bus capacity, restart delay.                        | [`LoopConfig`], [`LoopBuilder`]         |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use loopvisor::{Control, Loop, LoopError, Recoverings, Status};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let policy = |rs: Recoverings| -> Result<Recoverings, LoopError> {
//!         if rs.len() >= 5 {
//!             return Err(LoopError::fatal("too many panics"));
//!         }
//!         Ok(rs)
//!     };
//!
//!     let l = Loop::go_recoverable(
//!         |ctl: Control| async move {
//!             tokio::select! {
//!                 _ = ctl.shall_stop() => Ok(()),
//!                 _ = tokio::time::sleep(Duration::from_millis(1)) => panic!("ouch"),
//!             }
//!         },
//!         policy,
//!     );
//!
//!     assert_eq!(l.wait().await, Err(LoopError::fatal("too many panics")));
//!     assert_eq!(l.status(), Status::Stopped);
//! }
//! ```
mod bodies;
mod core;
mod error;
mod events;
mod policies;
pub mod recovery;
mod subscribers;

// ---- Public re-exports ----

pub use bodies::{Body, BodyFn, BodyRef, BoxBodyFuture};
pub use core::{Control, Loop, LoopBuilder, LoopConfig, Status};
pub use error::LoopError;
pub use events::{Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use recovery::{Reason, Recover, Recovering, Recoverings};
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
