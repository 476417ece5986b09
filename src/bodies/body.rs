//! # Loop body abstraction.
//!
//! A [`Body`] is the unit of work a loop supervises. Every invocation gets a
//! [`Control`] handle and produces a **fresh** future, so a recovering loop can
//! re-invoke the body after a panic without sharing state between attempts.
//!
//! The shared handle type is [`BodyRef`] (`Arc<dyn Body>`).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::core::Control;
use crate::error::LoopError;

/// Boxed future returned by [`Body::spawn`].
pub type BoxBodyFuture = Pin<Box<dyn Future<Output = Result<(), LoopError>> + Send + 'static>>;

/// Shared handle to a loop body.
pub type BodyRef = Arc<dyn Body>;

/// # Cooperative unit of work run by a loop.
///
/// Implementors should watch [`Control::shall_stop`] and return promptly once it
/// resolves. A body that never checks it cannot be stopped.
///
/// # Example
/// ```
/// use loopvisor::{Body, BoxBodyFuture, Control};
///
/// struct Idle;
///
/// impl Body for Idle {
///     fn spawn(&self, ctl: Control) -> BoxBodyFuture {
///         Box::pin(async move {
///             ctl.shall_stop().await;
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Body: Send + Sync + 'static {
    /// Creates the future for one invocation.
    fn spawn(&self, ctl: Control) -> BoxBodyFuture;
}
