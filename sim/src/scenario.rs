//! Scenario files: who is seated at genesis, which delegates exist, and the
//! ordered transactions to replay.
//!
//! Principals are written as labels and derived deterministically, or as
//! `0x`-prefixed hex when a literal address is wanted.

use anyhow::Context;
use quorate_domains::FeeSchedule;
use quorate_governance::{Genesis, GenesisDelegate, GovernanceConfig};
use quorate_types::{ActionKey, ActionType, Principal, RoleKind, Target};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    ValidatorAllowList,
    FeeRegistry,
    UpgradeProxy,
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub instance: InstanceKind,
    /// Overrides the instance preset when present.
    pub config: Option<GovernanceConfig>,
    #[serde(default)]
    pub fees: FeeSchedule,
    /// Initial implementation of an upgrade proxy.
    pub implementation: Option<String>,
    #[serde(default)]
    pub genesis: GenesisSpec,
    #[serde(default)]
    pub delegates: Vec<DelegateSpec>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenesisSpec {
    pub overlords: Vec<String>,
    pub guardians: Vec<String>,
    pub voters: Vec<String>,
    pub validators: Vec<String>,
    pub delegates: Vec<GenesisDelegateSpec>,
}

#[derive(Debug, Deserialize)]
pub struct GenesisDelegateSpec {
    pub role: RoleKind,
    pub id: String,
}

/// A delegate deployed before the scenario starts.
#[derive(Debug, Deserialize)]
pub struct DelegateSpec {
    pub id: String,
    /// Role name to member labels.
    #[serde(default)]
    pub members: BTreeMap<String, Vec<String>>,
}

/// Outcome a step is expected to have. `success` accepts any `Ok`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    #[default]
    Success,
    Executed,
    Pending,
    Unauthorized,
    InvalidTarget,
    AlreadyVoted,
    SessionBusy,
    CapacityExceeded,
    PreconditionFailed,
    ActionExecutionFailed,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Cast a vote at tick `at`.
    Vote {
        at: u64,
        caller: String,
        action: ActionType,
        target: Option<String>,
        value: Option<u64>,
        #[serde(default)]
        expect: Expect,
    },
    /// Apply an action on root authority.
    Direct {
        caller: String,
        action: ActionType,
        target: Option<String>,
        value: Option<u64>,
        #[serde(default)]
        expect: Expect,
    },
    /// Replace a delegate's member list for one role.
    SetMembers {
        delegate: String,
        role: RoleKind,
        members: Vec<String>,
    },
    /// Make a delegate fail every read, or recover.
    SetFailing { delegate: String, failing: bool },
}

impl Scenario {
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// The configuration to run with: explicit, or the instance preset.
    pub fn resolved_config(&self) -> GovernanceConfig {
        self.config.clone().unwrap_or_else(|| match self.instance {
            InstanceKind::ValidatorAllowList => GovernanceConfig::validator_allow_list(),
            InstanceKind::FeeRegistry => GovernanceConfig::fee_registry(),
            InstanceKind::UpgradeProxy => GovernanceConfig::upgrade_proxy(),
        })
    }
}

impl GenesisSpec {
    pub fn resolve(&self) -> anyhow::Result<Genesis> {
        let list = |labels: &[String]| -> anyhow::Result<Vec<Principal>> {
            labels.iter().map(|l| principal(l)).collect()
        };
        Ok(Genesis {
            overlords: list(&self.overlords)?,
            guardians: list(&self.guardians)?,
            voters: list(&self.voters)?,
            validators: list(&self.validators)?,
            delegates: self
                .delegates
                .iter()
                .map(|d| {
                    Ok(GenesisDelegate {
                        role: d.role,
                        id: principal(&d.id)?,
                    })
                })
                .collect::<anyhow::Result<_>>()?,
        })
    }
}

/// Resolve a principal label.
pub fn principal(label: &str) -> anyhow::Result<Principal> {
    if label.starts_with("0x") {
        label
            .parse()
            .with_context(|| format!("bad principal literal {label:?}"))
    } else {
        Ok(Principal::derive(label))
    }
}

/// Build the voted key from a step's action and its target fields.
pub fn action_key(
    action: ActionType,
    target: Option<&str>,
    value: Option<u64>,
) -> anyhow::Result<ActionKey> {
    let target = match (target, value) {
        (Some(label), None) => Target::Principal(principal(label)?),
        (None, Some(value)) => Target::Value(value),
        (None, None) => Target::None,
        (Some(_), Some(_)) => anyhow::bail!("{action}: give either target or value, not both"),
    };
    Ok(ActionKey::new(action, target))
}
