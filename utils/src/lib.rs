//! Shared utilities for quorate tooling.

pub mod logging;
pub mod stats;

pub use logging::{init_logging, LogFormat};
pub use stats::{Outcome, OutcomeCounter, OutcomeTally};
