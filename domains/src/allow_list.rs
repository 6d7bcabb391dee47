//! Validator allow-list.

use quorate_governance::{
    DelegateDirectory, Genesis, GovernanceConfig, GovernanceError, MembershipOnly,
};
use quorate_types::{Principal, RoleKind};

use crate::instance::Instance;

/// Voters admit and remove validators; overlords manage the voters.
pub type ValidatorAllowList = Instance<MembershipOnly>;

impl Instance<MembershipOnly> {
    /// An allow-list with the default simple-majority configuration.
    pub fn validator_allow_list(
        genesis: &Genesis,
        directory: Box<dyn DelegateDirectory>,
    ) -> Result<Self, GovernanceError> {
        Self::new(
            GovernanceConfig::validator_allow_list(),
            genesis,
            directory,
            MembershipOnly,
        )
    }

    /// Every validator currently allowed, local and delegated.
    pub fn validators(&self) -> Vec<Principal> {
        self.state().registry().effective_members(RoleKind::Validator)
    }

    pub fn is_validator(&self, who: &Principal) -> bool {
        self.state()
            .registry()
            .is_effective_member(RoleKind::Validator, who)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorate_governance::GovernanceError;
    use quorate_nullables::{NullClock, NullDirectory};
    use quorate_types::ActionKey;

    fn p(name: &str) -> Principal {
        Principal::derive(name)
    }

    fn allow_list() -> ValidatorAllowList {
        let genesis = Genesis {
            overlords: vec![p("o1")],
            voters: vec![p("v1"), p("v2"), p("v3")],
            validators: vec![p("val1")],
            ..Genesis::default()
        };
        ValidatorAllowList::validator_allow_list(&genesis, Box::new(NullDirectory::new())).unwrap()
    }

    #[test]
    fn voters_admit_a_validator_by_simple_majority() {
        let mut list = allow_list();
        let clock = NullClock::new(100);
        let key = ActionKey::add_member(RoleKind::Validator, p("val2"));

        let first = list.vote(&p("v1"), key, clock.now()).unwrap();
        assert_eq!(first.threshold, 2);
        assert!(!list.is_validator(&p("val2")));

        clock.advance(1);
        assert!(list.vote(&p("v2"), key, clock.now()).unwrap().executed);
        assert_eq!(list.validators(), vec![p("val1"), p("val2")]);
    }

    #[test]
    fn overlords_cannot_vote_on_validators() {
        let mut list = allow_list();
        let key = ActionKey::add_member(RoleKind::Validator, p("val2"));
        assert!(matches!(
            list.vote(&p("o1"), key, NullClock::new(0).now()),
            Err(GovernanceError::Unauthorized {
                role: RoleKind::Voter,
                ..
            })
        ));
    }

    #[test]
    fn parameters_are_unsupported() {
        let list = allow_list();
        let key = ActionKey::set_parameter(quorate_types::Parameter::BaseFee, 10);
        assert!(matches!(
            list.check(&key),
            Err(GovernanceError::InvalidTarget(_))
        ));
    }
}
