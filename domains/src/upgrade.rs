//! Upgrade proxy admin.

use quorate_governance::{
    ActionError, DelegateDirectory, DomainEffects, Genesis, GovernanceConfig, GovernanceError,
};
use quorate_types::{ActionKey, ActionType, Principal};
use serde::{Deserialize, Serialize};

use crate::instance::Instance;

/// The implementation a proxy forwards to, with every one it replaced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationSlot {
    current: Principal,
    history: Vec<Principal>,
}

impl ImplementationSlot {
    pub fn new(initial: Principal) -> Self {
        Self {
            current: initial,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> &Principal {
        &self.current
    }

    /// Previous implementations, oldest first.
    pub fn history(&self) -> &[Principal] {
        &self.history
    }

    fn proposed(key: &ActionKey) -> Result<Principal, ActionError> {
        match (key.action, key.target.as_principal()) {
            (ActionType::ExecuteUpgrade, Some(implementation)) => Ok(*implementation),
            _ => Err(ActionError::Unsupported(key.action.to_string())),
        }
    }
}

impl DomainEffects for ImplementationSlot {
    fn validate(&self, key: &ActionKey) -> Result<(), ActionError> {
        let implementation = Self::proposed(key)?;
        if implementation.is_zero() {
            return Err(ActionError::Rejected("null implementation".into()));
        }
        if implementation == self.current {
            return Err(ActionError::AlreadyApplied(format!(
                "{implementation} is the current implementation"
            )));
        }
        Ok(())
    }

    fn apply(&mut self, key: &ActionKey) -> Result<(), ActionError> {
        self.validate(key)?;
        let implementation = Self::proposed(key)?;
        let previous = std::mem::replace(&mut self.current, implementation);
        self.history.push(previous);
        tracing::info!(%previous, %implementation, "proxy upgraded");
        Ok(())
    }
}

/// Guardians vote upgrades by supermajority, one proposal at a time.
pub type UpgradeProxy = Instance<ImplementationSlot>;

impl Instance<ImplementationSlot> {
    pub fn upgrade_proxy(
        genesis: &Genesis,
        directory: Box<dyn DelegateDirectory>,
        implementation: Principal,
    ) -> Result<Self, GovernanceError> {
        if implementation.is_zero() {
            return Err(GovernanceError::InvalidTarget(
                "proxy needs an initial implementation".into(),
            ));
        }
        Self::new(
            GovernanceConfig::upgrade_proxy(),
            genesis,
            directory,
            ImplementationSlot::new(implementation),
        )
    }

    pub fn implementation(&self) -> &Principal {
        self.effects().current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorate_nullables::{NullClock, NullDirectory};

    fn p(name: &str) -> Principal {
        Principal::derive(name)
    }

    fn proxy() -> UpgradeProxy {
        let genesis = Genesis {
            overlords: vec![p("o")],
            guardians: vec![p("g1"), p("g2"), p("g3")],
            ..Genesis::default()
        };
        UpgradeProxy::upgrade_proxy(&genesis, Box::new(NullDirectory::new()), p("v1")).unwrap()
    }

    #[test]
    fn guardians_upgrade_and_history_is_kept() {
        let mut proxy = proxy();
        let clock = NullClock::new(0);
        let key = ActionKey::upgrade(p("v2"));

        proxy.vote(&p("g1"), key, clock.now()).unwrap();
        assert!(proxy.vote(&p("g2"), key, clock.now()).unwrap().executed);
        assert_eq!(proxy.implementation(), &p("v2"));
        assert_eq!(proxy.effects().history(), &[p("v1")]);
    }

    #[test]
    fn competing_upgrade_waits_for_the_session() {
        let mut proxy = proxy();
        let clock = NullClock::new(0);
        proxy
            .vote(&p("g1"), ActionKey::upgrade(p("v2")), clock.now())
            .unwrap();

        clock.advance(1);
        assert!(matches!(
            proxy.vote(&p("g2"), ActionKey::upgrade(p("v3")), clock.now()),
            Err(GovernanceError::SessionBusy { .. })
        ));

        clock.outlast(proxy.engine().config().expiry_window);
        let receipt = proxy
            .vote(&p("g2"), ActionKey::upgrade(p("v3")), clock.now())
            .unwrap();
        assert_eq!(receipt.votes, 1);
    }

    #[test]
    fn current_or_null_implementation_is_invalid() {
        let proxy = proxy();
        assert!(matches!(
            proxy.check(&ActionKey::upgrade(p("v1"))),
            Err(GovernanceError::InvalidTarget(_))
        ));
        assert!(matches!(
            proxy.check(&ActionKey::upgrade(Principal::ZERO)),
            Err(GovernanceError::InvalidTarget(_))
        ));
        assert!(matches!(
            proxy.check(&ActionKey::set_parameter(quorate_types::Parameter::BaseFee, 5)),
            Err(GovernanceError::InvalidTarget(_))
        ));
    }

    #[test]
    fn restored_proxy_keeps_implementation_history() {
        let mut proxy = proxy();
        let clock = NullClock::new(0);
        let key = ActionKey::upgrade(p("v2"));
        proxy.vote(&p("g1"), key, clock.now()).unwrap();
        proxy.vote(&p("g2"), key, clock.now()).unwrap();

        let bytes = proxy.save_state().unwrap();
        let restored = UpgradeProxy::restore(
            GovernanceConfig::upgrade_proxy(),
            &bytes,
            Box::new(NullDirectory::new()),
        )
        .unwrap();
        assert_eq!(restored.implementation(), &p("v2"));
        assert_eq!(restored.effects().history(), &[p("v1")]);
        assert!(restored.check(&ActionKey::upgrade(p("v2"))).is_err());
    }
}
