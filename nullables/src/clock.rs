//! Nullable clock: a hand-cranked ledger height.

use quorate_types::Tick;
use std::cell::Cell;

/// Ledger height under test control. Nothing moves it but the test.
#[derive(Debug, Default)]
pub struct NullClock {
    height: Cell<u64>,
}

impl NullClock {
    pub fn new(height: u64) -> Self {
        Self {
            height: Cell::new(height),
        }
    }

    pub fn now(&self) -> Tick {
        Tick::new(self.height.get())
    }

    /// Move forward by `ticks`, saturating at the top of the range.
    pub fn advance(&self, ticks: u64) -> Tick {
        self.height.set(self.height.get().saturating_add(ticks));
        self.now()
    }

    /// Move just far enough that a round opened now would be stale.
    pub fn outlast(&self, window: u64) -> Tick {
        self.advance(window.saturating_add(1))
    }

    pub fn set(&self, height: u64) {
        self.height.set(height);
    }
}
