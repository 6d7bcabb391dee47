//! Permanent revocation chains.
//!
//! Revoking a role hands its management to its delegates for good. The
//! preconditions are checked in a fixed order so the first failing one is the
//! one reported:
//!
//! 1. the role's local list is empty,
//! 2. at least one delegate is registered,
//! 3. every prerequisite role is already revoked, in configured order,
//! 4. the aggregated membership meets the role's floor.

use quorate_types::RoleKind;

use crate::aggregator;
use crate::config::RevocationRules;
use crate::error::GovernanceError;
use crate::registry::PrincipalRegistry;

pub fn check(
    registry: &PrincipalRegistry,
    rules: &RevocationRules,
    role: RoleKind,
) -> Result<(), GovernanceError> {
    let set = registry.role(role);
    if set.is_revoked() {
        return Err(GovernanceError::InvalidTarget(format!(
            "management of {role} is already revoked"
        )));
    }

    let local = set.local_members().len();
    if local > 0 {
        return Err(GovernanceError::PreconditionFailed(format!(
            "{role} still has {local} local member(s)"
        )));
    }

    if set.delegates().is_empty() {
        return Err(GovernanceError::PreconditionFailed(format!(
            "{role} has no registered delegate to take over"
        )));
    }

    let rule = rules.rule(role);
    if let Some(pending) = rule
        .requires
        .iter()
        .find(|prerequisite| !registry.role(**prerequisite).is_revoked())
    {
        return Err(GovernanceError::PreconditionFailed(format!(
            "{pending} management must be revoked before {role}"
        )));
    }

    let aggregated = aggregator::effective_members(set, role).len();
    if aggregated < rule.floor {
        return Err(GovernanceError::PreconditionFailed(format!(
            "{role} would be left with {aggregated} member(s), floor is {}",
            rule.floor
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DelegateError;
    use crate::registry::{Delegate, MembershipSource};
    use quorate_types::Principal;
    use std::sync::Arc;

    struct Count(usize);

    impl MembershipSource for Count {
        fn members(&self, _role: RoleKind) -> Result<Vec<Principal>, DelegateError> {
            Ok((0..self.0)
                .map(|i| Principal::derive(&format!("m{i}")))
                .collect())
        }

        fn is_member(&self, _role: RoleKind, _who: &Principal) -> Result<bool, DelegateError> {
            Ok(false)
        }
    }

    fn delegated(registry: &mut PrincipalRegistry, role: RoleKind, members: usize) {
        registry
            .role_mut(role)
            .attach_delegate(Delegate::new(Principal::derive("d"), Arc::new(Count(members))));
    }

    #[test]
    fn order_of_checks() {
        let rules = RevocationRules::default();
        let mut registry = PrincipalRegistry::new();
        registry.role_mut(RoleKind::Voter).insert_local(Principal::derive("v"));

        let err = check(&registry, &rules, RoleKind::Voter).unwrap_err();
        assert!(err.to_string().contains("local member"));

        registry.role_mut(RoleKind::Voter).remove_local(&Principal::derive("v"));
        let err = check(&registry, &rules, RoleKind::Voter).unwrap_err();
        assert!(err.to_string().contains("no registered delegate"));

        delegated(&mut registry, RoleKind::Voter, 0);
        let err = check(&registry, &rules, RoleKind::Voter).unwrap_err();
        assert!(err.to_string().contains("overlord management must be revoked"));

        registry.role_mut(RoleKind::Overlord).mark_revoked();
        let err = check(&registry, &rules, RoleKind::Voter).unwrap_err();
        assert!(err.to_string().contains("validator management must be revoked"));

        registry.role_mut(RoleKind::Validator).mark_revoked();
        let err = check(&registry, &rules, RoleKind::Voter).unwrap_err();
        assert!(err.to_string().contains("floor is 1"));
    }

    #[test]
    fn validator_floor_is_four() {
        let rules = RevocationRules::default();
        let mut registry = PrincipalRegistry::new();
        delegated(&mut registry, RoleKind::Validator, 3);
        assert!(matches!(
            check(&registry, &rules, RoleKind::Validator),
            Err(GovernanceError::PreconditionFailed(_))
        ));

        let mut registry = PrincipalRegistry::new();
        delegated(&mut registry, RoleKind::Validator, 4);
        assert!(check(&registry, &rules, RoleKind::Validator).is_ok());
    }

    #[test]
    fn revoked_role_is_end_state() {
        let rules = RevocationRules::default();
        let mut registry = PrincipalRegistry::new();
        delegated(&mut registry, RoleKind::Overlord, 2);
        registry.role_mut(RoleKind::Overlord).mark_revoked();
        assert!(matches!(
            check(&registry, &rules, RoleKind::Overlord),
            Err(GovernanceError::InvalidTarget(_))
        ));
    }
}
