//! Panic recovery: history bookkeeping and restart policies.
//!
//! ## Contents
//! - [`Reason`], [`Recovering`], [`Recoverings`] intercepted panics and their ordered history
//! - [`Recover`] the policy trait (implemented by plain closures)
//! - [`policies`] ready-made policies (`ignore`, `limit`, `limit_within`)
//!
//! ## Flow
//! ```text
//! body panics ──► Recovering::now(payload) appended to history
//!                     └─► policy.recover(history)
//!                            ├─ Ok(kept)  ─► restart body (unless a stop was requested)
//!                            └─ Err(e)    ─► loop stops with `e`
//! ```

mod policy;
mod recovering;

pub use policy::Recover;
pub use recovering::{Reason, Recovering, Recoverings};

pub(crate) use recovering::panic_message;

/// Ready-made recovery policies.
pub mod policies {
    pub use super::policy::{ignore, limit, limit_within};
}
