//! # Function-backed body (`BodyFn`)
//!
//! [`BodyFn`] wraps a closure `F: Fn(Control) -> Fut`, producing a fresh
//! future per invocation. There is no hidden mutation between restarts; shared
//! state has to be captured explicitly (e.g. through an `Arc`).
//!
//! ## Example
//! ```rust
//! use loopvisor::{BodyFn, BodyRef, Control, LoopError};
//!
//! let body: BodyRef = BodyFn::arc(|ctl: Control| async move {
//!     ctl.shall_stop().await;
//!     Ok::<_, LoopError>(())
//! });
//! # let _ = body;
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::bodies::body::{Body, BoxBodyFuture};
use crate::core::Control;
use crate::error::LoopError;

/// Function-backed body implementation.
#[derive(Debug)]
pub struct BodyFn<F> {
    f: F,
}

impl<F> BodyFn<F> {
    /// Wraps a closure.
    ///
    /// Prefer [`BodyFn::arc`] when you immediately need a [`BodyRef`](crate::BodyRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Body for BodyFn<F>
where
    F: Fn(Control) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), LoopError>> + Send + 'static,
{
    fn spawn(&self, ctl: Control) -> BoxBodyFuture {
        Box::pin((self.f)(ctl))
    }
}
