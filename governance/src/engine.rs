//! Core governance engine: casts votes and applies passed actions.
//!
//! Every public operation runs as one transaction: it works on a staged copy of
//! the caller's [`GovernanceState`], commits only on success and only then
//! delivers the notifications it produced. A failed call leaves tallies,
//! receipts, the session and the epoch exactly as they were.

use quorate_types::{ActionKey, ActionType, Epoch, Principal, RoleKind, RoundId, Tick};

use crate::config::GovernanceConfig;
use crate::dispatcher::{Dispatcher, DomainEffects};
use crate::error::GovernanceError;
use crate::events::{EventBus, GovernanceEvent};
use crate::registry::DelegateDirectory;
use crate::state::{Genesis, GovernanceState};

/// Result of a successfully recorded vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoteReceipt {
    pub round: RoundId,
    pub round_number: u64,
    /// Votes in the round after this one, including it.
    pub votes: u64,
    /// Threshold evaluated against the electorate at this vote.
    pub threshold: u64,
    pub executed: bool,
    /// Epoch after the call; advanced iff `executed`.
    pub epoch: Epoch,
}

pub struct GovernanceEngine {
    config: GovernanceConfig,
    directory: Box<dyn DelegateDirectory>,
    events: EventBus,
}

impl GovernanceEngine {
    pub fn new(
        config: GovernanceConfig,
        directory: Box<dyn DelegateDirectory>,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;
        Ok(Self {
            config,
            directory,
            events: EventBus::new(),
        })
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&GovernanceEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    /// Build the initial state for this instance.
    pub fn genesis(&self, genesis: &Genesis) -> Result<GovernanceState, GovernanceError> {
        GovernanceState::from_genesis(genesis, &self.config, self.directory.as_ref())
    }

    /// Restore a state saved with [`GovernanceState::save_state`].
    pub fn restore(&self, data: &[u8]) -> Result<GovernanceState, GovernanceError> {
        GovernanceState::load_state(data, self.directory.as_ref())
    }

    /// The role whose members vote on `action`.
    pub fn authorizing_role(&self, action: ActionType) -> RoleKind {
        self.config.charter.authorizing_role(action)
    }

    /// Threshold `action` would need if a vote were cast right now.
    pub fn threshold(&self, state: &GovernanceState, action: ActionType) -> u64 {
        let role = self.authorizing_role(action);
        self.config
            .quorum
            .threshold(state.registry.effective_members(role).len())
    }

    /// Whether `key` is currently permitted, without casting anything.
    pub fn check(
        &self,
        state: &GovernanceState,
        effects: &dyn DomainEffects,
        key: &ActionKey,
    ) -> Result<(), GovernanceError> {
        self.dispatcher().check(state, effects, key)
    }

    /// Cast `caller`'s vote for `key` at tick `now`.
    ///
    /// Executes the action when the vote brings the round to the threshold of
    /// the electorate as it stands at this vote.
    pub fn cast_vote(
        &self,
        state: &mut GovernanceState,
        effects: &mut dyn DomainEffects,
        caller: &Principal,
        key: ActionKey,
        now: Tick,
    ) -> Result<VoteReceipt, GovernanceError> {
        let mut staged = state.clone();
        let mut pending = Vec::new();
        let receipt = self.stage_vote(&mut staged, effects, caller, key, now, &mut pending)?;
        *state = staged;
        self.publish(&pending);
        Ok(receipt)
    }

    /// Apply `key` immediately on Root's authority, bypassing the vote.
    ///
    /// Same preconditions as a voted action; advances the epoch.
    pub fn apply_direct(
        &self,
        state: &mut GovernanceState,
        effects: &mut dyn DomainEffects,
        caller: &Principal,
        key: ActionKey,
    ) -> Result<Epoch, GovernanceError> {
        if !state.registry.is_effective_member(RoleKind::Root, caller) {
            return Err(GovernanceError::Unauthorized {
                role: RoleKind::Root,
                principal: *caller,
            });
        }
        let dispatcher = self.dispatcher();
        dispatcher.check(state, effects, &key)?;

        let mut staged = state.clone();
        let mut pending = Vec::new();
        dispatcher.apply(&mut staged, effects, &key, &mut pending)?;
        let epoch = staged.ledger.advance_epoch();
        tracing::info!(%key, %caller, %epoch, "direct mutation applied");
        pending.push(GovernanceEvent::ActionExecuted {
            key,
            votes: 0,
            threshold: 0,
            epoch,
        });

        *state = staged;
        self.publish(&pending);
        Ok(epoch)
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher {
            config: &self.config,
            directory: self.directory.as_ref(),
        }
    }

    fn publish(&self, pending: &[GovernanceEvent]) {
        for event in pending {
            self.events.emit(event);
        }
    }

    fn stage_vote(
        &self,
        state: &mut GovernanceState,
        effects: &mut dyn DomainEffects,
        caller: &Principal,
        key: ActionKey,
        now: Tick,
        pending: &mut Vec<GovernanceEvent>,
    ) -> Result<VoteReceipt, GovernanceError> {
        let role = self.authorizing_role(key.action);
        if !state.registry.is_effective_member(role, caller) {
            return Err(GovernanceError::Unauthorized {
                role,
                principal: *caller,
            });
        }
        let dispatcher = self.dispatcher();
        dispatcher.check(state, effects, &key)?;

        let window = self.config.expiry_window;
        for (round, stale) in state.ledger.expire_stale(window, now) {
            let key = stale.key;
            tracing::info!(
                %key,
                round_number = stale.round_number,
                votes = stale.total_votes(),
                "round expired, starting a new one"
            );
            pending.push(GovernanceEvent::ProposalExpired {
                key,
                round,
                round_number: stale.round_number,
                votes: stale.total_votes(),
            });
        }

        let round = state.ledger.current_round_id(&key);
        let round_number = state.ledger.round_number(&key);

        if self.config.single_session {
            if let Some(released) = state.ledger.claim_session(&round, window, now)? {
                tracing::info!(key = %released.key, "stale session released");
                pending.push(GovernanceEvent::SessionReleased {
                    key: released.key,
                    round: released.round,
                });
            }
        }

        if state
            .ledger
            .open_round(round, key, now, self.config.single_session)
        {
            tracing::debug!(%key, round_number, start = %now, "round opened");
        }

        let votes = state.ledger.record_vote(&round, caller)?;
        let threshold = self.threshold(state, key.action);
        tracing::debug!(%key, voter = %caller, votes, threshold, "vote recorded");

        let executed = votes >= threshold;
        if executed {
            dispatcher.apply(state, effects, &key, pending)?;
            let epoch = state.ledger.advance_epoch();
            tracing::info!(%key, votes, threshold, %epoch, "quorum reached, action executed");
            pending.push(GovernanceEvent::ActionExecuted {
                key,
                votes,
                threshold,
                epoch,
            });
        }

        pending.push(GovernanceEvent::VoteCast {
            key,
            round,
            round_number,
            voter: *caller,
            votes,
            threshold,
        });

        Ok(VoteReceipt {
            round,
            round_number,
            votes,
            threshold,
            executed,
            epoch: state.ledger.epoch(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::MembershipOnly;
    use crate::error::DelegateError;
    use crate::quorum::QuorumPolicy;
    use crate::registry::MembershipSource;
    use std::sync::Arc;

    struct RootOnly(Principal);

    impl MembershipSource for RootOnly {
        fn members(&self, role: RoleKind) -> Result<Vec<Principal>, DelegateError> {
            Ok(if role == RoleKind::Root { vec![self.0] } else { vec![] })
        }

        fn is_member(&self, role: RoleKind, who: &Principal) -> Result<bool, DelegateError> {
            Ok(role == RoleKind::Root && who == &self.0)
        }
    }

    struct Directory(Principal);

    impl DelegateDirectory for Directory {
        fn resolve(&self, id: &Principal) -> Option<Arc<dyn MembershipSource>> {
            (id == &Principal::derive("root-registry"))
                .then(|| Arc::new(RootOnly(self.0)) as Arc<dyn MembershipSource>)
        }
    }

    fn p(name: &str) -> Principal {
        Principal::derive(name)
    }

    fn setup(quorum: QuorumPolicy) -> (GovernanceEngine, GovernanceState) {
        let config = GovernanceConfig {
            expiry_window: 10,
            quorum,
            ..GovernanceConfig::default()
        };
        let engine = GovernanceEngine::new(config, Box::new(Directory(p("root")))).unwrap();
        let genesis = Genesis {
            overlords: vec![p("a"), p("b"), p("c")],
            voters: vec![p("v")],
            delegates: vec![crate::state::GenesisDelegate {
                role: RoleKind::Root,
                id: p("root-registry"),
            }],
            ..Genesis::default()
        };
        let state = engine.genesis(&genesis).unwrap();
        (engine, state)
    }

    #[test]
    fn second_vote_executes_under_supermajority() {
        let (engine, mut state) = setup(QuorumPolicy::Supermajority);
        let key = ActionKey::add_member(RoleKind::Voter, p("x"));

        let first = engine
            .cast_vote(&mut state, &mut MembershipOnly, &p("a"), key, Tick::new(1))
            .unwrap();
        assert_eq!((first.votes, first.threshold, first.executed), (1, 2, false));

        let second = engine
            .cast_vote(&mut state, &mut MembershipOnly, &p("b"), key, Tick::new(2))
            .unwrap();
        assert!(second.executed);
        assert_eq!(second.epoch, Epoch::new(1));
        assert!(state.registry().is_effective_member(RoleKind::Voter, &p("x")));
    }

    #[test]
    fn non_member_is_unauthorized() {
        let (engine, mut state) = setup(QuorumPolicy::SimpleMajority);
        let key = ActionKey::add_member(RoleKind::Voter, p("x"));
        let err = engine
            .cast_vote(&mut state, &mut MembershipOnly, &p("v"), key, Tick::new(1))
            .unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::Unauthorized {
                role: RoleKind::Overlord,
                ..
            }
        ));
    }

    #[test]
    fn direct_mutation_requires_root_and_bumps_epoch() {
        let (engine, mut state) = setup(QuorumPolicy::SimpleMajority);
        let key = ActionKey::add_member(RoleKind::Guardian, p("g"));

        assert!(matches!(
            engine.apply_direct(&mut state, &mut MembershipOnly, &p("a"), key),
            Err(GovernanceError::Unauthorized { .. })
        ));

        let epoch = engine
            .apply_direct(&mut state, &mut MembershipOnly, &p("root"), key)
            .unwrap();
        assert_eq!(epoch, Epoch::new(1));
        assert!(state.registry().role(RoleKind::Guardian).contains_local(&p("g")));
    }

    #[test]
    fn unsupported_domain_action_is_rejected_before_voting() {
        let (engine, mut state) = setup(QuorumPolicy::SimpleMajority);
        let key = ActionKey::upgrade(p("impl"));
        let err = engine
            .cast_vote(&mut state, &mut MembershipOnly, &p("a"), key, Tick::new(1))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidTarget(_)));
        assert!(state.ledger().current_tally(&key).is_none());
    }
}
