use proptest::prelude::*;

use quorate_governance::{
    Genesis, GovernanceConfig, GovernanceEngine, GovernanceError, QuorumPolicy,
};
use quorate_nullables::{NullClock, NullDirectory, NullEffects};
use quorate_types::{ActionKey, Parameter, Principal};

fn overlord(i: usize) -> Principal {
    Principal::derive(&format!("overlord-{i}"))
}

proptest! {
    /// Ledger invariants hold after every vote of an arbitrary schedule:
    /// tallies match their receipts, the epoch moves only on execution,
    /// and no round ever overshoots its threshold.
    #[test]
    fn ledger_invariants_hold(
        schedule in prop::collection::vec((0usize..5, 0u64..3, 0u64..40), 1..60),
    ) {
        let config = GovernanceConfig {
            expiry_window: 50,
            quorum: QuorumPolicy::SimpleMajority,
            ..GovernanceConfig::default()
        };
        let engine = GovernanceEngine::new(config, Box::new(NullDirectory::new())).unwrap();
        let genesis = Genesis {
            overlords: (0..5).map(overlord).collect(),
            ..Genesis::default()
        };
        let mut state = engine.genesis(&genesis).unwrap();
        let mut effects = NullEffects::new();
        let clock = NullClock::new(0);

        for (who, value, wait) in schedule {
            clock.advance(wait);
            let key = ActionKey::set_parameter(Parameter::BaseFee, value);
            let epoch = state.epoch();
            let applied = effects.applied().len();

            match engine.cast_vote(&mut state, &mut effects, &overlord(who), key, clock.now()) {
                Ok(receipt) => {
                    prop_assert!(receipt.votes <= receipt.threshold);
                    prop_assert_eq!(receipt.threshold, 3);
                    if receipt.executed {
                        prop_assert_eq!(state.epoch(), epoch.next());
                        prop_assert_eq!(effects.applied().len(), applied + 1);
                        prop_assert!(state.ledger().current_tally(&key).is_none());
                    } else {
                        prop_assert_eq!(state.epoch(), epoch);
                        let tally = state.ledger().current_tally(&key).unwrap();
                        prop_assert!(tally.has_voted(&overlord(who)));
                    }
                }
                Err(GovernanceError::AlreadyVoted { .. }) => {
                    prop_assert_eq!(state.epoch(), epoch);
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }

            for (_, tally) in state.ledger().open_rounds() {
                prop_assert_eq!(tally.total_votes(), tally.voters().len() as u64);
                prop_assert!(tally.total_votes() < 3);
            }
        }
    }
}
