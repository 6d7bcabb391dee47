//! Ledger tick type used throughout the engine.
//!
//! A tick is the host ledger's monotonic height counter. The engine never reads
//! a wall clock; every state-changing operation receives the current tick.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A monotonic ledger height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick(u64);

impl Tick {
    /// The genesis tick.
    pub const ZERO: Self = Self(0);

    pub fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Ticks elapsed since this tick (relative to `now`).
    pub fn elapsed_since(&self, now: Tick) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether `now` lies strictly beyond `self + window`.
    ///
    /// A round started at tick 10 with a window of 5 still accepts votes at
    /// tick 15 and is stale from tick 16 onwards.
    pub fn is_past(&self, window: u64, now: Tick) -> bool {
        now.0 > self.0.saturating_add(window)
    }

    pub fn saturating_add(&self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for Tick {
    fn from(height: u64) -> Self {
        Self(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_boundary_is_inclusive() {
        let start = Tick::new(10);
        assert!(!start.is_past(5, Tick::new(15)));
        assert!(start.is_past(5, Tick::new(16)));
    }

    #[test]
    fn is_past_saturates() {
        let start = Tick::new(u64::MAX - 1);
        assert!(!start.is_past(10, Tick::new(u64::MAX)));
    }

    #[test]
    fn elapsed_saturates_backwards() {
        assert_eq!(Tick::new(20).elapsed_since(Tick::new(5)), 0);
        assert_eq!(Tick::new(5).elapsed_since(Tick::new(20)), 15);
    }
}
