//! Threshold governance engine.
//!
//! A dynamic set of principals must reach a quorum before a proposed change
//! takes effect. The engine provides:
//!
//! - **Rounds** keyed by `(epoch, action, target, round number)`, opened by the
//!   first vote and superseded on expiry or on any execution.
//! - **Live quorum**: the threshold is recomputed from the effective membership
//!   on every vote.
//! - **Delegated membership**: role sets union a local list with external,
//!   best-effort delegates.
//! - **Single-session locking** for instances that allow one proposal at a time.
//! - **Revocation chains** that irreversibly hand a role to its delegates.
//!
//! One principal, one vote; nothing is stake-weighted.

pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod quorum;
pub mod registry;
pub mod revocation;
pub mod state;

pub use config::{Charter, GovernanceConfig, RevocationRule, RevocationRules, RoleCapacities};
pub use dispatcher::{DomainEffects, MembershipOnly};
pub use engine::{GovernanceEngine, VoteReceipt};
pub use error::{ActionError, DelegateError, GovernanceError};
pub use events::{EventBus, GovernanceEvent};
pub use ledger::{ActiveSession, ProposalLedger, RoundTally};
pub use quorum::QuorumPolicy;
pub use registry::{Delegate, DelegateDirectory, MembershipSource, PrincipalRegistry, RoleSet};
pub use state::{Genesis, GenesisDelegate, GovernanceState};
