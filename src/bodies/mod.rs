//! # Loop bodies.
//!
//! - [`Body`] trait for the supervised unit of work
//! - [`BodyFn`] closure-backed implementation
//! - [`BodyRef`] shared reference (`Arc<dyn Body>`)

mod body;
mod body_fn;

pub use body::{Body, BodyRef, BoxBodyFuture};
pub use body_fn::BodyFn;
