//! Role kinds: the named governance groups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// A named role set.
///
/// `Root`, `Overlord`, `Guardian` and `Voter` are voting roles. `Validator` is
/// a governed, non-voting set (the validator allow-list) that shares the same
/// membership and revocation machinery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    Root,
    Overlord,
    Guardian,
    Voter,
    Validator,
}

impl RoleKind {
    pub const ALL: [RoleKind; 5] = [
        RoleKind::Root,
        RoleKind::Overlord,
        RoleKind::Guardian,
        RoleKind::Voter,
        RoleKind::Validator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Overlord => "overlord",
            Self::Guardian => "guardian",
            Self::Voter => "voter",
            Self::Validator => "validator",
        }
    }

    /// Stable one-byte code used in round id derivation.
    pub fn code(&self) -> u8 {
        match self {
            Self::Root => 0,
            Self::Overlord => 1,
            Self::Guardian => 2,
            Self::Voter => 3,
            Self::Validator => 4,
        }
    }

    /// Whether members of this role may cast votes.
    pub fn is_voting(&self) -> bool {
        !matches!(self, Self::Validator)
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleKind::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypesError::UnknownRole(s.to_string()))
    }
}
