//! Voter aggregator: best-effort union of local and delegated membership.
//!
//! Every delegate is queried independently. A delegate that errors or returns
//! malformed data contributes nothing for that call; aggregation as a whole
//! never fails.

use quorate_types::{Principal, RoleKind};

use crate::error::DelegateError;
use crate::registry::{Delegate, MembershipSource, RoleSet};

/// Collapse a delegate read to its value, or to the empty value on failure.
fn or_empty<T: Default>(delegate: &Delegate, role: RoleKind, result: Result<T, DelegateError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                delegate = %delegate.id,
                %role,
                error = %e,
                "delegate read failed, skipping"
            );
            T::default()
        }
    }
}

/// Members reported by one delegate; the null principal marks a response as malformed.
fn delegate_members(delegate: &Delegate, role: RoleKind) -> Result<Vec<Principal>, DelegateError> {
    let members = delegate.source().members(role)?;
    if members.iter().any(Principal::is_zero) {
        return Err(DelegateError::Malformed(
            "null principal in member list".into(),
        ));
    }
    Ok(members)
}

/// Local members followed by every delegate's members, in registration order.
///
/// Not deduplicated: local and delegated lists are kept disjoint by
/// governance, not at read time.
pub fn effective_members(set: &RoleSet, role: RoleKind) -> Vec<Principal> {
    let mut members = set.local_members().to_vec();
    for delegate in set.delegates() {
        members.extend(or_empty(delegate, role, delegate_members(delegate, role)));
    }
    members
}

/// Number of members currently contributed by delegates alone.
pub fn delegated_count(set: &RoleSet, role: RoleKind) -> usize {
    set.delegates()
        .iter()
        .map(|d| or_empty(d, role, delegate_members(d, role)).len())
        .sum()
}

/// A delegate vouches for `who` only while its member listing is well formed
/// and contains `who`, so authorization and thresholds see the same members.
pub fn is_effective_member(set: &RoleSet, role: RoleKind, who: &Principal) -> bool {
    if who.is_zero() {
        return false;
    }
    if set.contains_local(who) {
        return true;
    }
    set.delegates().iter().any(|d| {
        or_empty(d, role, delegate_members(d, role)).contains(who)
            && or_empty(d, role, d.source().is_member(role, who))
    })
}

/// Registration-time compatibility probe: both read capabilities must answer.
pub fn probe(source: &dyn MembershipSource, role: RoleKind) -> Result<(), DelegateError> {
    source.members(role)?;
    source.is_member(role, &Principal::ZERO)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Failing;

    impl MembershipSource for Failing {
        fn members(&self, _role: RoleKind) -> Result<Vec<Principal>, DelegateError> {
            Err(DelegateError::Unavailable("offline".into()))
        }

        fn is_member(&self, _role: RoleKind, _who: &Principal) -> Result<bool, DelegateError> {
            Err(DelegateError::Unavailable("offline".into()))
        }
    }

    struct Listing(Vec<Principal>);

    impl MembershipSource for Listing {
        fn members(&self, _role: RoleKind) -> Result<Vec<Principal>, DelegateError> {
            Ok(self.0.clone())
        }

        fn is_member(&self, _role: RoleKind, who: &Principal) -> Result<bool, DelegateError> {
            Ok(self.0.contains(who))
        }
    }

    fn source(s: impl MembershipSource + 'static) -> Arc<dyn MembershipSource> {
        Arc::new(s)
    }

    fn set_with(delegates: Vec<(&str, Arc<dyn MembershipSource>)>) -> RoleSet {
        let mut set = RoleSet::default();
        set.insert_local(Principal::derive("local"));
        for (id, source) in delegates {
            set.attach_delegate(Delegate::new(Principal::derive(id), source));
        }
        set
    }

    #[test]
    fn failing_delegate_contributes_nothing() {
        let set = set_with(vec![
            ("bad", source(Failing)),
            ("good", source(Listing(vec![Principal::derive("r")]))),
        ]);
        assert_eq!(
            effective_members(&set, RoleKind::Voter),
            vec![Principal::derive("local"), Principal::derive("r")]
        );
        assert_eq!(delegated_count(&set, RoleKind::Voter), 1);
        assert!(is_effective_member(&set, RoleKind::Voter, &Principal::derive("r")));
    }

    #[test]
    fn malformed_listing_is_dropped() {
        let set = set_with(vec![(
            "odd",
            source(Listing(vec![Principal::derive("r"), Principal::ZERO])),
        )]);
        assert_eq!(effective_members(&set, RoleKind::Voter).len(), 1);
    }

    #[test]
    fn null_principal_is_never_a_member() {
        let set = set_with(vec![("odd", source(Listing(vec![Principal::ZERO])))]);
        assert!(!is_effective_member(&set, RoleKind::Voter, &Principal::ZERO));
    }

    #[test]
    fn probe_surfaces_errors() {
        assert!(probe(&Failing, RoleKind::Voter).is_err());
        assert!(probe(&Listing(vec![]), RoleKind::Voter).is_ok());
    }

    #[test]
    fn malformed_delegate_vouches_for_nobody() {
        let r = Principal::derive("r");
        let set = set_with(vec![("bad", source(Listing(vec![r, Principal::ZERO])))]);
        assert!(!is_effective_member(&set, RoleKind::Voter, &r));
        assert!(is_effective_member(&set, RoleKind::Voter, &Principal::derive("local")));
    }

    #[test]
    fn listing_and_point_query_must_agree() {
        struct Disowning(Principal);

        impl MembershipSource for Disowning {
            fn members(&self, _role: RoleKind) -> Result<Vec<Principal>, DelegateError> {
                Ok(vec![self.0])
            }

            fn is_member(&self, _role: RoleKind, _who: &Principal) -> Result<bool, DelegateError> {
                Ok(false)
            }
        }

        let r = Principal::derive("r");
        let set = set_with(vec![("odd", source(Disowning(r)))]);
        assert!(!is_effective_member(&set, RoleKind::Voter, &r));
    }
}
