//! The closed catalog of governable actions and their targets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::principal::Principal;
use crate::role::RoleKind;

/// Numeric parameters governable through `SetParameter`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    /// Flat fee charged per registry operation.
    BaseFee,
    /// Upper bound on sponsored gas per transaction.
    SponsorshipCap,
    /// Share of collected fees routed to the fee vault, in basis points.
    FeeShareBps,
}

impl Parameter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BaseFee => "base_fee",
            Self::SponsorshipCap => "sponsorship_cap",
            Self::FeeShareBps => "fee_share_bps",
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::BaseFee => 0,
            Self::SponsorshipCap => 1,
            Self::FeeShareBps => 2,
        }
    }
}

/// What a proposal does once it reaches quorum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Add the target principal to a role's local list.
    AddMember(RoleKind),
    /// Remove the target principal from a role's local list.
    RemoveMember(RoleKind),
    /// Register the target as an external membership delegate for a role.
    AddDelegate(RoleKind),
    /// Permanently hand a role's management over to its delegates.
    RevokeManagement(RoleKind),
    /// Change a numeric parameter to the target value.
    SetParameter(Parameter),
    /// Point the upgrade proxy at the target implementation.
    ExecuteUpgrade,
}

impl ActionType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddMember(_) => "add_member",
            Self::RemoveMember(_) => "remove_member",
            Self::AddDelegate(_) => "add_delegate",
            Self::RevokeManagement(_) => "revoke_management",
            Self::SetParameter(_) => "set_parameter",
            Self::ExecuteUpgrade => "execute_upgrade",
        }
    }

    /// Two-byte code: action tag followed by its role or parameter.
    pub fn code(&self) -> [u8; 2] {
        match self {
            Self::AddMember(r) => [0, r.code()],
            Self::RemoveMember(r) => [1, r.code()],
            Self::AddDelegate(r) => [2, r.code()],
            Self::RevokeManagement(r) => [3, r.code()],
            Self::SetParameter(p) => [4, p.code()],
            Self::ExecuteUpgrade => [5, 0],
        }
    }

    /// The role set whose membership this action governs, if any.
    pub fn subject_role(&self) -> Option<RoleKind> {
        match self {
            Self::AddMember(r)
            | Self::RemoveMember(r)
            | Self::AddDelegate(r)
            | Self::RevokeManagement(r) => Some(*r),
            Self::SetParameter(_) | Self::ExecuteUpgrade => None,
        }
    }

    /// Whether `target` has the shape this action expects.
    pub fn accepts(&self, target: &Target) -> bool {
        match self {
            Self::AddMember(_) | Self::RemoveMember(_) | Self::AddDelegate(_) | Self::ExecuteUpgrade => {
                matches!(target, Target::Principal(_))
            }
            Self::SetParameter(_) => matches!(target, Target::Value(_)),
            Self::RevokeManagement(_) => matches!(target, Target::None),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddMember(r)
            | Self::RemoveMember(r)
            | Self::AddDelegate(r)
            | Self::RevokeManagement(r) => write!(f, "{}({})", self.name(), r),
            Self::SetParameter(p) => write!(f, "{}({})", self.name(), p.name()),
            Self::ExecuteUpgrade => f.write_str(self.name()),
        }
    }
}

/// The value a proposal is voted on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Principal(Principal),
    Value(u64),
    /// Sentinel for parameterless actions.
    None,
}

impl Target {
    pub fn as_principal(&self) -> Option<&Principal> {
        match self {
            Self::Principal(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<u64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Tagged byte encoding used in round id derivation.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Principal(p) => {
                let mut out = Vec::with_capacity(1 + Principal::LEN);
                out.push(0);
                out.extend_from_slice(p.as_bytes());
                out
            }
            Self::Value(v) => {
                let mut out = Vec::with_capacity(9);
                out.push(1);
                out.extend_from_slice(&v.to_le_bytes());
                out
            }
            Self::None => vec![2],
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Principal(p) => write!(f, "{p}"),
            Self::Value(v) => write!(f, "{v}"),
            Self::None => f.write_str("-"),
        }
    }
}

impl From<Principal> for Target {
    fn from(p: Principal) -> Self {
        Self::Principal(p)
    }
}

/// The `(action, target)` pair a proposal is voted on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionKey {
    pub action: ActionType,
    pub target: Target,
}

impl ActionKey {
    pub fn new(action: ActionType, target: impl Into<Target>) -> Self {
        Self {
            action,
            target: target.into(),
        }
    }

    pub fn add_member(role: RoleKind, who: Principal) -> Self {
        Self::new(ActionType::AddMember(role), who)
    }

    pub fn remove_member(role: RoleKind, who: Principal) -> Self {
        Self::new(ActionType::RemoveMember(role), who)
    }

    pub fn add_delegate(role: RoleKind, delegate: Principal) -> Self {
        Self::new(ActionType::AddDelegate(role), delegate)
    }

    pub fn revoke(role: RoleKind) -> Self {
        Self::new(ActionType::RevokeManagement(role), Target::None)
    }

    pub fn set_parameter(param: Parameter, value: u64) -> Self {
        Self::new(ActionType::SetParameter(param), Target::Value(value))
    }

    pub fn upgrade(implementation: Principal) -> Self {
        Self::new(ActionType::ExecuteUpgrade, implementation)
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.action, self.target)
    }
}
