//! Fundamental types for the quorate governance engine.
//!
//! This crate defines the vocabulary shared by every other crate in the workspace:
//! principals, ticks, epochs, round identifiers, role kinds and the closed
//! catalog of governable actions.

pub mod action;
pub mod error;
pub mod principal;
pub mod role;
pub mod round;
pub mod time;

pub use action::{ActionKey, ActionType, Parameter, Target};
pub use error::TypesError;
pub use principal::Principal;
pub use role::RoleKind;
pub use round::{Epoch, RoundId};
pub use time::Tick;
