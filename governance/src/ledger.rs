//! Proposal ledger: rounds, vote receipts, the epoch and the active session.
//!
//! Rounds are never created explicitly. A round id is derived from the current
//! epoch, the action key and that key's round number; the first vote under an
//! id opens the round. A round dies when it expires (the key's round number
//! moves on) or when any action executes (the epoch moves on).

use quorate_types::{ActionKey, Epoch, Principal, RoundId, Tick};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::GovernanceError;

/// Votes collected by one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTally {
    pub key: ActionKey,
    pub round_number: u64,
    pub start: Tick,
    total_votes: u64,
    voters: BTreeSet<Principal>,
}

impl RoundTally {
    fn open(key: ActionKey, round_number: u64, start: Tick) -> Self {
        Self {
            key,
            round_number,
            start,
            total_votes: 0,
            voters: BTreeSet::new(),
        }
    }

    pub fn total_votes(&self) -> u64 {
        self.total_votes
    }

    pub fn voters(&self) -> &BTreeSet<Principal> {
        &self.voters
    }

    pub fn has_voted(&self, who: &Principal) -> bool {
        self.voters.contains(who)
    }
}

/// The single round allowed to collect votes in single-session instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub round: RoundId,
    pub key: ActionKey,
    pub start: Tick,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalLedger {
    epoch: Epoch,
    round_numbers: BTreeMap<ActionKey, u64>,
    rounds: BTreeMap<RoundId, RoundTally>,
    session: Option<ActiveSession>,
}

impl ProposalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn round_number(&self, key: &ActionKey) -> u64 {
        self.round_numbers.get(key).copied().unwrap_or(0)
    }

    pub fn current_round_id(&self, key: &ActionKey) -> RoundId {
        RoundId::derive(self.epoch, key, self.round_number(key))
    }

    pub fn tally(&self, round: &RoundId) -> Option<&RoundTally> {
        self.rounds.get(round)
    }

    /// Tally of the key's current round, if it has any votes.
    pub fn current_tally(&self, key: &ActionKey) -> Option<&RoundTally> {
        self.tally(&self.current_round_id(key))
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    /// Rounds currently holding votes.
    pub fn open_rounds(&self) -> impl Iterator<Item = (&RoundId, &RoundTally)> {
        self.rounds.iter()
    }

    /// Supersede every round that is stale at `now`.
    ///
    /// Each expired round loses its receipts and its key moves on to the next
    /// round number. Returns the discarded tallies in round id order.
    pub(crate) fn expire_stale(&mut self, window: u64, now: Tick) -> Vec<(RoundId, RoundTally)> {
        let stale: Vec<RoundId> = self
            .rounds
            .iter()
            .filter(|(_, t)| t.total_votes > 0 && t.start.is_past(window, now))
            .map(|(round, _)| *round)
            .collect();
        let mut expired = Vec::with_capacity(stale.len());
        for round in stale {
            if let Some(tally) = self.rounds.remove(&round) {
                *self.round_numbers.entry(tally.key).or_insert(0) += 1;
                expired.push((round, tally));
            }
        }
        expired
    }

    /// Make sure `round` may collect votes under the single-session rule.
    ///
    /// Returns the session that was released because its window had passed.
    pub(crate) fn claim_session(
        &mut self,
        round: &RoundId,
        window: u64,
        now: Tick,
    ) -> Result<Option<ActiveSession>, GovernanceError> {
        match self.session {
            Some(active) if &active.round != round => {
                if active.start.is_past(window, now) {
                    self.session = None;
                    Ok(Some(active))
                } else {
                    Err(GovernanceError::SessionBusy { active: active.key })
                }
            }
            _ => Ok(None),
        }
    }

    /// Open `round` at `now` if it has no votes yet. Returns whether it was opened.
    pub(crate) fn open_round(
        &mut self,
        round: RoundId,
        key: ActionKey,
        now: Tick,
        claim_session: bool,
    ) -> bool {
        if self.rounds.get(&round).is_some_and(|t| t.total_votes > 0) {
            return false;
        }
        let round_number = self.round_number(&key);
        self.rounds
            .insert(round, RoundTally::open(key, round_number, now));
        if claim_session {
            self.session = Some(ActiveSession {
                round,
                key,
                start: now,
            });
        }
        true
    }

    /// Record a vote and return the round's new total.
    pub(crate) fn record_vote(
        &mut self,
        round: &RoundId,
        who: &Principal,
    ) -> Result<u64, GovernanceError> {
        let tally = self.rounds.get_mut(round).ok_or_else(|| {
            GovernanceError::PreconditionFailed(format!("round {round} is not open"))
        })?;
        if !tally.voters.insert(*who) {
            return Err(GovernanceError::AlreadyVoted {
                principal: *who,
                round: *round,
            });
        }
        tally.total_votes += 1;
        Ok(tally.total_votes)
    }

    /// Bump the epoch. Every in-flight round and the session die with it.
    pub(crate) fn advance_epoch(&mut self) -> Epoch {
        self.rounds.clear();
        self.session = None;
        self.epoch = self.epoch.next();
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorate_types::RoleKind;

    fn key() -> ActionKey {
        ActionKey::add_member(RoleKind::Voter, Principal::derive("x"))
    }

    fn vote(ledger: &mut ProposalLedger, who: &str, now: u64) -> Result<u64, GovernanceError> {
        let key = key();
        ledger.expire_stale(10, Tick::new(now));
        let round = ledger.current_round_id(&key);
        ledger.open_round(round, key, Tick::new(now), false);
        ledger.record_vote(&round, &Principal::derive(who))
    }

    #[test]
    fn receipts_are_exclusive() {
        let mut ledger = ProposalLedger::new();
        assert_eq!(vote(&mut ledger, "a", 0).unwrap(), 1);
        assert!(matches!(
            vote(&mut ledger, "a", 1),
            Err(GovernanceError::AlreadyVoted { .. })
        ));
        assert_eq!(vote(&mut ledger, "b", 2).unwrap(), 2);
        let tally = ledger.current_tally(&key()).unwrap();
        assert_eq!(tally.total_votes(), tally.voters().len() as u64);
    }

    #[test]
    fn stale_round_rotates() {
        let mut ledger = ProposalLedger::new();
        vote(&mut ledger, "a", 0).unwrap();
        let first = ledger.current_round_id(&key());

        assert_eq!(vote(&mut ledger, "b", 10).unwrap(), 2);
        assert_eq!(ledger.round_number(&key()), 0);

        assert_eq!(vote(&mut ledger, "a", 11).unwrap(), 1);
        assert_eq!(ledger.round_number(&key()), 1);
        assert_ne!(ledger.current_round_id(&key()), first);
        assert!(ledger.tally(&first).is_none());
    }

    #[test]
    fn epoch_bump_clears_everything() {
        let mut ledger = ProposalLedger::new();
        vote(&mut ledger, "a", 0).unwrap();
        let epoch = ledger.advance_epoch();
        assert_eq!(epoch, Epoch::new(1));
        assert_eq!(ledger.open_rounds().count(), 0);
        assert_eq!(vote(&mut ledger, "a", 1).unwrap(), 1);
    }

    #[test]
    fn session_blocks_other_rounds_until_stale() {
        let mut ledger = ProposalLedger::new();
        let k1 = key();
        let k2 = ActionKey::add_member(RoleKind::Voter, Principal::derive("y"));
        let r1 = ledger.current_round_id(&k1);
        let r2 = ledger.current_round_id(&k2);

        ledger.claim_session(&r1, 10, Tick::new(0)).unwrap();
        ledger.open_round(r1, k1, Tick::new(0), true);

        assert!(ledger.claim_session(&r1, 10, Tick::new(5)).unwrap().is_none());
        assert!(matches!(
            ledger.claim_session(&r2, 10, Tick::new(10)),
            Err(GovernanceError::SessionBusy { .. })
        ));
        let released = ledger.claim_session(&r2, 10, Tick::new(11)).unwrap();
        assert_eq!(released.map(|s| s.round), Some(r1));
        assert!(ledger.session().is_none());
    }

    #[test]
    fn abandoned_rounds_are_pruned_by_later_activity() {
        let mut ledger = ProposalLedger::new();
        let other = ActionKey::add_member(RoleKind::Voter, Principal::derive("y"));
        let abandoned = ledger.current_round_id(&other);
        ledger.open_round(abandoned, other, Tick::new(0), false);
        ledger.record_vote(&abandoned, &Principal::derive("a")).unwrap();

        vote(&mut ledger, "b", 5).unwrap();
        assert_eq!(ledger.open_rounds().count(), 2);

        vote(&mut ledger, "c", 11).unwrap();
        assert!(ledger.tally(&abandoned).is_none());
        assert_eq!(ledger.round_number(&other), 1);
        assert_eq!(ledger.open_rounds().count(), 1);
    }
}
