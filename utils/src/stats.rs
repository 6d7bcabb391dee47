//! Outcome counters for replay summaries.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Something a replay step can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    Step,
    Vote,
    Direct,
    Executed,
    Rejected,
    Mismatch,
    Event,
}

impl Outcome {
    const COUNT: usize = 7;
}

/// Thread-safe tally of [`Outcome`]s, shared with event listeners.
#[derive(Debug, Default)]
pub struct OutcomeCounter {
    counts: [AtomicU64; Outcome::COUNT],
}

impl OutcomeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: Outcome) {
        self.counts[outcome as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, outcome: Outcome) -> u64 {
        self.counts[outcome as usize].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> OutcomeTally {
        OutcomeTally {
            steps: self.get(Outcome::Step),
            votes: self.get(Outcome::Vote),
            direct: self.get(Outcome::Direct),
            executed: self.get(Outcome::Executed),
            rejected: self.get(Outcome::Rejected),
            mismatches: self.get(Outcome::Mismatch),
            events: self.get(Outcome::Event),
        }
    }
}

/// Point-in-time copy of an [`OutcomeCounter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub steps: u64,
    pub votes: u64,
    pub direct: u64,
    pub executed: u64,
    pub rejected: u64,
    pub mismatches: u64,
    pub events: u64,
}
