//! # Loop configuration.
//!
//! [`LoopConfig`] holds the per-loop settings consumed by
//! [`Loop::builder`](crate::Loop::builder).
//!
//! ## Sentinel values
//! - `restart_delay = None` → restart a recovered body immediately
//! - `bus_capacity = 0` → clamped to 1

use std::borrow::Cow;

use crate::policies::BackoffPolicy;

/// Settings for one supervised loop.
///
/// All fields are public; prefer the helper accessors over checking sentinels directly.
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Name attached to every event and exposed through [`Control::name`](crate::Control::name).
    pub name: Cow<'static, str>,

    /// Capacity of the event bus ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Delay between a recovered panic and the next invocation.
    ///
    /// Only used by recovering loops. The delay is cut short by `stop`/`kill`,
    /// which then ends the loop as a clean return.
    pub restart_delay: Option<BackoffPolicy>,
}

impl LoopConfig {
    /// Config with the given name and defaults elsewhere.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for LoopConfig {
    /// - `name = "loop"`
    /// - `bus_capacity = 1024`
    /// - `restart_delay = None` (immediate restarts)
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("loop"),
            bus_capacity: 1024,
            restart_delay: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = LoopConfig::default();
        assert_eq!(cfg.name, "loop");
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
        assert!(cfg.restart_delay.is_none());
    }

    #[test]
    fn capacity_is_clamped() {
        let cfg = LoopConfig {
            bus_capacity: 0,
            ..LoopConfig::named("worker")
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.name, "worker");
    }
}
