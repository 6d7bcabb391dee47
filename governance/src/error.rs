use quorate_types::{ActionKey, Principal, RoleKind, RoundId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("{principal} is not an effective {role}")]
    Unauthorized { role: RoleKind, principal: Principal },

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("{principal} has already voted in round {round}")]
    AlreadyVoted { principal: Principal, round: RoundId },

    #[error("another proposal holds the active session: {active}")]
    SessionBusy { active: ActionKey },

    #[error("{role} capacity exceeded: limit {limit}")]
    CapacityExceeded { role: RoleKind, limit: usize },

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("action execution failed: {0}")]
    ActionExecutionFailed(#[from] ActionError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Failure raised by an action effect. Effects that fail leave no trace.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("{0} is not supported by this instance")]
    Unsupported(String),

    #[error("target already in requested state: {0}")]
    AlreadyApplied(String),

    #[error("{name} value {value} out of bounds (max {max})")]
    OutOfBounds { name: &'static str, value: u64, max: u64 },

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Rejected(String),
}

/// Failure reading from an external membership delegate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DelegateError {
    #[error("delegate unavailable: {0}")]
    Unavailable(String),

    #[error("malformed delegate response: {0}")]
    Malformed(String),
}
