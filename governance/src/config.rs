//! Governance instance configuration with TOML file support.

use quorate_types::{ActionType, RoleKind};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::quorum::QuorumPolicy;

/// Configuration for one governance instance.
///
/// Can be loaded from a TOML file via [`GovernanceConfig::from_toml_file`],
/// taken from one of the instance presets, or built programmatically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Ticks a round may sit idle after its first vote before it is superseded.
    #[serde(default = "default_expiry_window")]
    pub expiry_window: u64,

    /// Quorum rule applied to the live electorate on every vote.
    #[serde(default)]
    pub quorum: QuorumPolicy,

    /// Allow only one round at a time to collect votes.
    #[serde(default)]
    pub single_session: bool,

    /// Forbid holding Overlord and Guardian at once.
    #[serde(default = "default_true")]
    pub exclusive_roles: bool,

    /// Optional ceilings on aggregated role sizes.
    #[serde(default)]
    pub capacities: RoleCapacities,

    /// Which role votes on which action.
    #[serde(default)]
    pub charter: Charter,

    /// Ordered preconditions for permanent revocation, per role.
    #[serde(default)]
    pub revocation: RevocationRules,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_expiry_window() -> u64 {
    7_200
}

fn default_true() -> bool {
    true
}

fn default_floor() -> usize {
    1
}

/// Per-role ceilings on the aggregated member count. Root is never capped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleCapacities {
    pub overlord: Option<usize>,
    pub guardian: Option<usize>,
    pub voter: Option<usize>,
    pub validator: Option<usize>,
}

impl RoleCapacities {
    pub fn limit(&self, role: RoleKind) -> Option<usize> {
        match role {
            RoleKind::Root => None,
            RoleKind::Overlord => self.overlord,
            RoleKind::Guardian => self.guardian,
            RoleKind::Voter => self.voter,
            RoleKind::Validator => self.validator,
        }
    }
}

/// Maps every action to the role whose members vote on it.
///
/// Membership actions on role `r` are voted by `r`'s manager; parameter and
/// upgrade actions by the `executive` role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Charter {
    pub root: RoleKind,
    pub overlord: RoleKind,
    pub guardian: RoleKind,
    pub voter: RoleKind,
    pub validator: RoleKind,
    pub executive: RoleKind,
}

impl Default for Charter {
    fn default() -> Self {
        Self {
            root: RoleKind::Root,
            overlord: RoleKind::Overlord,
            guardian: RoleKind::Overlord,
            voter: RoleKind::Overlord,
            validator: RoleKind::Voter,
            executive: RoleKind::Overlord,
        }
    }
}

impl Charter {
    /// The role that votes on membership changes of `role`.
    pub fn manager(&self, role: RoleKind) -> RoleKind {
        match role {
            RoleKind::Root => self.root,
            RoleKind::Overlord => self.overlord,
            RoleKind::Guardian => self.guardian,
            RoleKind::Voter => self.voter,
            RoleKind::Validator => self.validator,
        }
    }

    pub fn authorizing_role(&self, action: ActionType) -> RoleKind {
        match action.subject_role() {
            Some(role) => self.manager(role),
            None => self.executive,
        }
    }

    fn assignments(&self) -> [(&'static str, RoleKind); 6] {
        [
            ("root", self.root),
            ("overlord", self.overlord),
            ("guardian", self.guardian),
            ("voter", self.voter),
            ("validator", self.validator),
            ("executive", self.executive),
        ]
    }
}

/// Preconditions for revoking one role's local management.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRule {
    /// Roles that must already be revoked, checked in this order.
    #[serde(default)]
    pub requires: Vec<RoleKind>,

    /// Minimum aggregated member count at revocation time.
    #[serde(default = "default_floor")]
    pub floor: usize,
}

impl RevocationRule {
    pub fn new(requires: Vec<RoleKind>, floor: usize) -> Self {
        Self { requires, floor }
    }
}

impl Default for RevocationRule {
    fn default() -> Self {
        Self::new(Vec::new(), default_floor())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevocationRules {
    pub root: RevocationRule,
    pub overlord: RevocationRule,
    pub guardian: RevocationRule,
    pub voter: RevocationRule,
    pub validator: RevocationRule,
}

impl Default for RevocationRules {
    fn default() -> Self {
        Self {
            root: RevocationRule::new(vec![RoleKind::Voter, RoleKind::Guardian], 1),
            overlord: RevocationRule::new(Vec::new(), 1),
            guardian: RevocationRule::new(Vec::new(), 1),
            voter: RevocationRule::new(vec![RoleKind::Overlord, RoleKind::Validator], 1),
            validator: RevocationRule::new(Vec::new(), 4),
        }
    }
}

impl RevocationRules {
    pub fn rule(&self, role: RoleKind) -> &RevocationRule {
        match role {
            RoleKind::Root => &self.root,
            RoleKind::Overlord => &self.overlord,
            RoleKind::Guardian => &self.guardian,
            RoleKind::Voter => &self.voter,
            RoleKind::Validator => &self.validator,
        }
    }

    /// Reject chains where a role (transitively) requires itself.
    fn check_acyclic(&self) -> Result<(), GovernanceError> {
        for role in RoleKind::ALL {
            let mut stack = self.rule(role).requires.clone();
            let mut seen = Vec::new();
            while let Some(next) = stack.pop() {
                if next == role {
                    return Err(GovernanceError::Config(format!(
                        "revocation chain for {role} depends on itself"
                    )));
                }
                if !seen.contains(&next) {
                    seen.push(next);
                    stack.extend(self.rule(next).requires.iter().copied());
                }
            }
        }
        Ok(())
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl GovernanceConfig {
    /// Validator allow-list: voters admit validators, overlords manage voters.
    pub fn validator_allow_list() -> Self {
        Self {
            quorum: QuorumPolicy::SimpleMajority,
            ..Self::default()
        }
    }

    /// Registry/fee governance: overlords change parameters by supermajority.
    pub fn fee_registry() -> Self {
        Self {
            quorum: QuorumPolicy::Supermajority,
            ..Self::default()
        }
    }

    /// Upgrade-proxy admin: guardians vote upgrades, one session at a time.
    pub fn upgrade_proxy() -> Self {
        Self {
            quorum: QuorumPolicy::Supermajority,
            single_session: true,
            charter: Charter {
                executive: RoleKind::Guardian,
                ..Charter::default()
            },
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, GovernanceError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GovernanceError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GovernanceError> {
        let config: Self = toml::from_str(s).map_err(|e| GovernanceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, GovernanceError> {
        toml::to_string_pretty(self).map_err(|e| GovernanceError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.expiry_window == 0 {
            return Err(GovernanceError::Config(
                "expiry_window must be at least one tick".into(),
            ));
        }
        self.quorum.validate()?;
        for (slot, role) in self.charter.assignments() {
            if !role.is_voting() {
                return Err(GovernanceError::Config(format!(
                    "charter slot {slot} assigned to non-voting role {role}"
                )));
            }
        }
        for role in RoleKind::ALL {
            if self.capacities.limit(role) == Some(0) {
                return Err(GovernanceError::Config(format!(
                    "{role} capacity must be positive"
                )));
            }
        }
        self.revocation.check_acyclic()
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            expiry_window: default_expiry_window(),
            quorum: QuorumPolicy::default(),
            single_session: false,
            exclusive_roles: default_true(),
            capacities: RoleCapacities::default(),
            charter: Charter::default(),
            revocation: RevocationRules::default(),
        }
    }
}
