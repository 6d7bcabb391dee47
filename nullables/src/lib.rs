//! Nullable infrastructure for deterministic testing.
//!
//! Everything the engine consumes from its host (the ledger clock, delegate
//! contracts, the delegate directory, instance effects) is abstracted behind a
//! trait. This crate provides controllable implementations that:
//! - Return deterministic values
//! - Can be switched into failure modes programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests and simulations.

pub mod clock;
pub mod delegate;
pub mod effects;

pub use clock::NullClock;
pub use delegate::{NullDelegate, NullDirectory};
pub use effects::NullEffects;
