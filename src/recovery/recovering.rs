//! # Recovery history.
//!
//! A [`Recovering`] records one intercepted panic: when it happened and the
//! panic payload ([`Reason`]). [`Recoverings`] is the ordered history handed to
//! a recovery policy; it only grows by appending, policies shrink it by
//! returning a smaller history.
//!
//! The history is owned by the loop task and never shared with callers.

use std::any::Any;
use std::fmt;
use std::time::{Duration, SystemTime};

/// Reads a panic payload as text when it is a `&str` or a `String`.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        Some(msg)
    } else {
        payload.downcast_ref::<String>().map(String::as_str)
    }
}

/// Payload of an intercepted panic.
///
/// `panic!("...")` produces a message payload readable via [`Reason::message`];
/// `std::panic::panic_any(value)` carries an arbitrary value readable via
/// [`Reason::downcast_ref`].
pub struct Reason(Box<dyn Any + Send>);

impl Reason {
    /// Wraps a raw panic payload.
    pub fn new(payload: Box<dyn Any + Send>) -> Self {
        Self(payload)
    }

    /// Returns the panic message for `&str`/`String` payloads.
    pub fn message(&self) -> Option<&str> {
        panic_message(&*self.0)
    }

    /// Returns the payload as `T` if it has that type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// True if the payload has type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Consumes the reason and returns the raw payload (e.g. to resume the panic).
    pub fn into_inner(self) -> Box<dyn Any + Send> {
        self.0
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reason").field(&self.to_string()).finish()
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(msg) = self.message() {
            f.write_str(msg)
        } else if let Some(err) = self.downcast_ref::<crate::LoopError>() {
            write!(f, "{err}")
        } else {
            f.write_str("opaque panic payload")
        }
    }
}

/// One intercepted panic.
#[derive(Debug)]
pub struct Recovering {
    /// Wall-clock time the panic was caught.
    pub time: SystemTime,
    /// Panic payload.
    pub reason: Reason,
}

impl Recovering {
    /// Records `reason` at the current time.
    pub fn now(reason: Reason) -> Self {
        Self {
            time: SystemTime::now(),
            reason,
        }
    }
}

/// Ordered history of intercepted panics (oldest first).
#[derive(Debug, Default)]
pub struct Recoverings(Vec<Recovering>);

impl Recoverings {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a recovering.
    pub fn push(&mut self, r: Recovering) {
        self.0.push(r);
    }

    /// Most recent recovering, if any.
    pub fn last(&self) -> Option<&Recovering> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> std::slice::Iter<'_, Recovering> {
        self.0.iter()
    }

    /// Keeps only recoverings newer than `window` relative to `now`.
    ///
    /// Entries with a timestamp in the future (clock adjustments) are kept.
    pub fn retain_within(mut self, window: Duration, now: SystemTime) -> Self {
        self.0.retain(|r| match now.duration_since(r.time) {
            Ok(age) => age <= window,
            Err(_) => true,
        });
        self
    }
}

impl<'a> IntoIterator for &'a Recoverings {
    type Item = &'a Recovering;
    type IntoIter = std::slice::Iter<'a, Recovering>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Recovering>> for Recoverings {
    fn from(v: Vec<Recovering>) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LoopError;

    fn at(secs: u64, reason: &'static str) -> Recovering {
        Recovering {
            time: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
            reason: Reason::new(Box::new(reason)),
        }
    }

    #[test]
    fn reason_reads_str_and_string_payloads() {
        assert_eq!(Reason::new(Box::new("ouch")).message(), Some("ouch"));
        assert_eq!(
            Reason::new(Box::new(String::from("formatted 1"))).message(),
            Some("formatted 1")
        );
        assert_eq!(Reason::new(Box::new(42u8)).message(), None);
    }

    #[test]
    fn reason_downcasts_error_payloads() {
        let r = Reason::new(Box::new(LoopError::fail("timed out")));
        assert!(r.is::<LoopError>());
        assert_eq!(
            r.downcast_ref::<LoopError>().and_then(LoopError::message),
            Some("timed out")
        );
        assert_eq!(r.to_string(), "execution failed: timed out");
    }

    #[test]
    fn last_is_newest() {
        let mut rs = Recoverings::new();
        assert!(rs.last().is_none());
        rs.push(at(1, "a"));
        rs.push(at(2, "b"));
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.last().and_then(|r| r.reason.message()), Some("b"));
    }

    #[test]
    fn retain_within_drops_old_entries() {
        let rs: Recoverings = vec![at(1, "old"), at(50, "mid"), at(100, "new")].into();
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let kept = rs.retain_within(Duration::from_secs(60), now);
        let names: Vec<_> = kept.iter().filter_map(|r| r.reason.message()).collect();
        assert_eq!(names, vec!["mid", "new"]);
    }
}
