//! Action dispatcher: the closed table from action type to effect.
//!
//! Membership actions are applied to [`GovernanceState`] directly. Parameter
//! and upgrade actions belong to the instance and go through its
//! [`DomainEffects`]. Every effect either applies fully or fails untouched.

use quorate_types::{ActionKey, ActionType, Principal, RoleKind};
use serde::{Deserialize, Serialize};

use crate::aggregator;
use crate::config::GovernanceConfig;
use crate::error::{ActionError, GovernanceError};
use crate::events::GovernanceEvent;
use crate::registry::{Delegate, DelegateDirectory};
use crate::revocation;
use crate::state::GovernanceState;

/// Instance-specific effects for `SetParameter` and `ExecuteUpgrade`.
///
/// Implementations must not call back into the engine.
pub trait DomainEffects {
    /// Whether `key` may currently be applied. Must not mutate anything.
    fn validate(&self, key: &ActionKey) -> Result<(), ActionError>;

    /// Apply `key`. On error nothing may have changed.
    fn apply(&mut self, key: &ActionKey) -> Result<(), ActionError>;
}

/// Effects for instances that govern membership only.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MembershipOnly;

impl DomainEffects for MembershipOnly {
    fn validate(&self, key: &ActionKey) -> Result<(), ActionError> {
        Err(ActionError::Unsupported(key.action.to_string()))
    }

    fn apply(&mut self, key: &ActionKey) -> Result<(), ActionError> {
        Err(ActionError::Unsupported(key.action.to_string()))
    }
}

pub(crate) struct Dispatcher<'a> {
    pub config: &'a GovernanceConfig,
    pub directory: &'a dyn DelegateDirectory,
}

fn principal_target(key: &ActionKey) -> Result<Principal, GovernanceError> {
    match key.target.as_principal() {
        Some(p) if !p.is_zero() => Ok(*p),
        Some(_) => Err(GovernanceError::InvalidTarget("null principal".into())),
        None => Err(GovernanceError::InvalidTarget(format!(
            "{} expects a principal target",
            key.action
        ))),
    }
}

fn reject_if_revoked(state: &GovernanceState, role: RoleKind) -> Result<(), GovernanceError> {
    if state.registry.role(role).is_revoked() {
        return Err(GovernanceError::PreconditionFailed(format!(
            "{role} is governed by its delegates only"
        )));
    }
    Ok(())
}

impl Dispatcher<'_> {
    /// Check whether `key` is currently permitted, without side effects.
    pub fn check(
        &self,
        state: &GovernanceState,
        effects: &dyn DomainEffects,
        key: &ActionKey,
    ) -> Result<(), GovernanceError> {
        if !key.action.accepts(&key.target) {
            return Err(GovernanceError::InvalidTarget(format!(
                "{} does not take target {}",
                key.action, key.target
            )));
        }
        match key.action {
            ActionType::AddMember(role) => self.check_add_member(state, role, key),
            ActionType::RemoveMember(role) => self.check_remove_member(state, role, key),
            ActionType::AddDelegate(role) => self.resolve_delegate(state, role, key).map(|_| ()),
            ActionType::RevokeManagement(role) => {
                revocation::check(&state.registry, &self.config.revocation, role)
            }
            ActionType::SetParameter(_) | ActionType::ExecuteUpgrade => effects
                .validate(key)
                .map_err(|e| GovernanceError::InvalidTarget(e.to_string())),
        }
    }

    /// Apply `key`. Any failure surfaces as `ActionExecutionFailed`.
    pub fn apply(
        &self,
        state: &mut GovernanceState,
        effects: &mut dyn DomainEffects,
        key: &ActionKey,
        events: &mut Vec<GovernanceEvent>,
    ) -> Result<(), GovernanceError> {
        let precondition = |e: GovernanceError| ActionError::Precondition(e.to_string());
        match key.action {
            ActionType::AddMember(role) => {
                self.check_add_member(state, role, key).map_err(precondition)?;
                let who = principal_target(key).map_err(precondition)?;
                state.registry.role_mut(role).insert_local(who);
            }
            ActionType::RemoveMember(role) => {
                self.check_remove_member(state, role, key).map_err(precondition)?;
                let who = principal_target(key).map_err(precondition)?;
                state.registry.role_mut(role).remove_local(&who);
            }
            ActionType::AddDelegate(role) => {
                let delegate = self.resolve_delegate(state, role, key).map_err(precondition)?;
                state.registry.role_mut(role).attach_delegate(delegate);
            }
            ActionType::RevokeManagement(role) => {
                revocation::check(&state.registry, &self.config.revocation, role)
                    .map_err(precondition)?;
                state.registry.role_mut(role).mark_revoked();
                tracing::info!(%role, "management permanently revoked");
                events.push(GovernanceEvent::DomainRevoked { role });
            }
            ActionType::SetParameter(_) | ActionType::ExecuteUpgrade => effects.apply(key)?,
        }
        Ok(())
    }

    fn check_add_member(
        &self,
        state: &GovernanceState,
        role: RoleKind,
        key: &ActionKey,
    ) -> Result<(), GovernanceError> {
        reject_if_revoked(state, role)?;
        if role == RoleKind::Root {
            return Err(GovernanceError::InvalidTarget(
                "root membership is sourced from its external registry".into(),
            ));
        }
        let who = principal_target(key)?;
        let registry = &state.registry;
        if registry.is_effective_member(role, &who) {
            return Err(GovernanceError::InvalidTarget(format!(
                "{who} is already a {role}"
            )));
        }
        if self.config.exclusive_roles {
            let rival = match role {
                RoleKind::Overlord => Some(RoleKind::Guardian),
                RoleKind::Guardian => Some(RoleKind::Overlord),
                _ => None,
            };
            if let Some(rival) = rival.filter(|r| registry.is_effective_member(*r, &who)) {
                return Err(GovernanceError::InvalidTarget(format!(
                    "{who} is a {rival} and cannot also be a {role}"
                )));
            }
        }
        if let Some(limit) = self.config.capacities.limit(role) {
            if registry.effective_members(role).len() >= limit {
                return Err(GovernanceError::CapacityExceeded { role, limit });
            }
        }
        Ok(())
    }

    fn check_remove_member(
        &self,
        state: &GovernanceState,
        role: RoleKind,
        key: &ActionKey,
    ) -> Result<(), GovernanceError> {
        reject_if_revoked(state, role)?;
        let who = principal_target(key)?;
        let set = state.registry.role(role);
        if !set.contains_local(&who) {
            return Err(GovernanceError::InvalidTarget(format!(
                "{who} is not a local {role}"
            )));
        }
        let remaining = set.local_members().len() - 1 + aggregator::delegated_count(set, role);
        if remaining == 0 {
            return Err(GovernanceError::PreconditionFailed(format!(
                "cannot remove the last {role} while no delegate can take over"
            )));
        }
        Ok(())
    }

    fn resolve_delegate(
        &self,
        state: &GovernanceState,
        role: RoleKind,
        key: &ActionKey,
    ) -> Result<Delegate, GovernanceError> {
        let id = principal_target(key)?;
        if state.registry.role(role).has_delegate(&id) {
            return Err(GovernanceError::InvalidTarget(format!(
                "{id} is already a {role} delegate"
            )));
        }
        let source = self.directory.resolve(&id).ok_or_else(|| {
            GovernanceError::InvalidTarget(format!("no delegate deployed at {id}"))
        })?;
        aggregator::probe(source.as_ref(), role).map_err(|e| {
            GovernanceError::PreconditionFailed(format!(
                "delegate {id} failed compatibility probe: {e}"
            ))
        })?;
        Ok(Delegate::new(id, source))
    }
}
