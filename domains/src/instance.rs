//! A governance engine bound to its state and effects.

use quorate_governance::{
    DelegateDirectory, DomainEffects, Genesis, GovernanceConfig, GovernanceEngine,
    GovernanceError, GovernanceEvent, GovernanceState, VoteReceipt,
};
use quorate_types::{ActionKey, Epoch, Principal, Tick};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Governance state and domain effects persisted together.
#[derive(Serialize, Deserialize)]
struct InstanceSnapshot<E> {
    governance: Vec<u8>,
    effects: E,
}

/// One deployed governance instance.
///
/// Owns everything a transaction touches, so `&mut self` is the single
/// serialization point.
pub struct Instance<E> {
    engine: GovernanceEngine,
    state: GovernanceState,
    effects: E,
}

impl<E: DomainEffects> Instance<E> {
    pub fn new(
        config: GovernanceConfig,
        genesis: &Genesis,
        directory: Box<dyn DelegateDirectory>,
        effects: E,
    ) -> Result<Self, GovernanceError> {
        let engine = GovernanceEngine::new(config, directory)?;
        let state = engine.genesis(genesis)?;
        tracing::debug!(
            quorum = ?engine.config().quorum,
            single_session = engine.config().single_session,
            "governance instance created"
        );
        Ok(Self {
            engine,
            state,
            effects,
        })
    }

    pub fn vote(
        &mut self,
        caller: &Principal,
        key: ActionKey,
        now: Tick,
    ) -> Result<VoteReceipt, GovernanceError> {
        self.engine
            .cast_vote(&mut self.state, &mut self.effects, caller, key, now)
    }

    pub fn apply_direct(
        &mut self,
        caller: &Principal,
        key: ActionKey,
    ) -> Result<Epoch, GovernanceError> {
        self.engine
            .apply_direct(&mut self.state, &mut self.effects, caller, key)
    }

    /// Dry-run: would a vote on `key` pass the action's preconditions now?
    pub fn check(&self, key: &ActionKey) -> Result<(), GovernanceError> {
        self.engine.check(&self.state, &self.effects, key)
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&GovernanceEvent) + Send + Sync>) {
        self.engine.subscribe(listener);
    }

    pub fn engine(&self) -> &GovernanceEngine {
        &self.engine
    }

    pub fn state(&self) -> &GovernanceState {
        &self.state
    }

    pub fn effects(&self) -> &E {
        &self.effects
    }

    pub fn epoch(&self) -> Epoch {
        self.state.epoch()
    }
}

impl<E: DomainEffects + Serialize + DeserializeOwned> Instance<E> {
    /// Snapshot the governance state together with the domain effects.
    pub fn save_state(&self) -> Result<Vec<u8>, GovernanceError> {
        let snapshot = InstanceSnapshot {
            governance: self.state.save_state()?,
            effects: &self.effects,
        };
        bincode::serialize(&snapshot).map_err(|e| GovernanceError::Snapshot(e.to_string()))
    }

    /// Resume from a snapshot written by [`Instance::save_state`].
    pub fn restore(
        config: GovernanceConfig,
        snapshot: &[u8],
        directory: Box<dyn DelegateDirectory>,
    ) -> Result<Self, GovernanceError> {
        let snapshot: InstanceSnapshot<E> = bincode::deserialize(snapshot)
            .map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        let engine = GovernanceEngine::new(config, directory)?;
        let state = engine.restore(&snapshot.governance)?;
        tracing::debug!(epoch = %state.epoch(), "governance instance restored");
        Ok(Self {
            engine,
            state,
            effects: snapshot.effects,
        })
    }
}
