//! Governance state: the versioned object threaded through every operation.
//!
//! There are no hidden globals: the registry, the epoch, every round and the
//! active session live here, and the engine only ever mutates a state it was
//! handed by `&mut`.

use quorate_types::{Epoch, Principal, RoleKind};
use serde::{Deserialize, Serialize};

use crate::aggregator;
use crate::config::GovernanceConfig;
use crate::error::GovernanceError;
use crate::ledger::ProposalLedger;
use crate::registry::{Delegate, DelegateDirectory, PrincipalRegistry, RoleSnapshot};

#[derive(Clone, Debug, Default)]
pub struct GovernanceState {
    pub(crate) registry: PrincipalRegistry,
    pub(crate) ledger: ProposalLedger,
}

/// A delegate wired in at genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisDelegate {
    pub role: RoleKind,
    pub id: Principal,
}

/// Initial membership of a governance instance.
///
/// Root has no local list: root authority always comes from a delegate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Genesis {
    pub overlords: Vec<Principal>,
    pub guardians: Vec<Principal>,
    pub voters: Vec<Principal>,
    pub validators: Vec<Principal>,
    pub delegates: Vec<GenesisDelegate>,
}

impl Genesis {
    fn local_lists(&self) -> [(RoleKind, &[Principal]); 4] {
        [
            (RoleKind::Overlord, self.overlords.as_slice()),
            (RoleKind::Guardian, self.guardians.as_slice()),
            (RoleKind::Voter, self.voters.as_slice()),
            (RoleKind::Validator, self.validators.as_slice()),
        ]
    }
}

#[derive(Serialize, Deserialize)]
struct StateSnapshot {
    roles: Vec<(RoleKind, RoleSnapshot)>,
    ledger: ProposalLedger,
}

impl GovernanceState {
    /// Build the initial state. Seeding does not advance the epoch.
    pub fn from_genesis(
        genesis: &Genesis,
        config: &GovernanceConfig,
        directory: &dyn DelegateDirectory,
    ) -> Result<Self, GovernanceError> {
        let mut state = Self::default();

        for (role, members) in genesis.local_lists() {
            for who in members {
                if who.is_zero() {
                    return Err(GovernanceError::InvalidTarget(format!(
                        "null principal in genesis {role} list"
                    )));
                }
                if state.registry.role(role).contains_local(who) {
                    return Err(GovernanceError::InvalidTarget(format!(
                        "{who} listed twice as genesis {role}"
                    )));
                }
                state.registry.role_mut(role).insert_local(*who);
            }
        }

        if config.exclusive_roles {
            let overlords = state.registry.role(RoleKind::Overlord);
            if let Some(both) = genesis
                .guardians
                .iter()
                .find(|g| overlords.contains_local(g))
            {
                return Err(GovernanceError::InvalidTarget(format!(
                    "{both} cannot be both overlord and guardian"
                )));
            }
        }

        for entry in &genesis.delegates {
            if entry.id.is_zero() {
                return Err(GovernanceError::InvalidTarget(format!(
                    "null delegate for {}",
                    entry.role
                )));
            }
            let source = directory.resolve(&entry.id).ok_or_else(|| {
                GovernanceError::InvalidTarget(format!("no delegate deployed at {}", entry.id))
            })?;
            aggregator::probe(source.as_ref(), entry.role).map_err(|e| {
                GovernanceError::PreconditionFailed(format!(
                    "delegate {} failed compatibility probe: {e}",
                    entry.id
                ))
            })?;
            state
                .registry
                .role_mut(entry.role)
                .attach_delegate(Delegate::new(entry.id, source));
        }

        for role in RoleKind::ALL {
            if let Some(limit) = config.capacities.limit(role) {
                if state.registry.effective_members(role).len() > limit {
                    return Err(GovernanceError::CapacityExceeded { role, limit });
                }
            }
        }

        Ok(state)
    }

    pub fn registry(&self) -> &PrincipalRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &ProposalLedger {
        &self.ledger
    }

    pub fn epoch(&self) -> Epoch {
        self.ledger.epoch()
    }

    /// Serialize the state for persistence. Delegates are stored by id.
    pub fn save_state(&self) -> Result<Vec<u8>, GovernanceError> {
        let snapshot = StateSnapshot {
            roles: self.registry.snapshot(),
            ledger: self.ledger.clone(),
        };
        bincode::serialize(&snapshot).map_err(|e| GovernanceError::Snapshot(e.to_string()))
    }

    /// Restore a state, re-attaching delegates through `directory`.
    pub fn load_state(
        data: &[u8],
        directory: &dyn DelegateDirectory,
    ) -> Result<Self, GovernanceError> {
        let snapshot: StateSnapshot =
            bincode::deserialize(data).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        let registry = PrincipalRegistry::restore(snapshot.roles, directory).map_err(|id| {
            GovernanceError::Snapshot(format!("delegate {id} no longer resolves"))
        })?;
        Ok(Self {
            registry,
            ledger: snapshot.ledger,
        })
    }
}
