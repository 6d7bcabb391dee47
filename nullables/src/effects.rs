//! Nullable effects: records applied domain actions.

use quorate_governance::{ActionError, DomainEffects};
use quorate_types::ActionKey;

/// Accepts every parameter and upgrade action and records it.
///
/// Can be told to reject validation or to fail at apply time, to exercise
/// the engine's all-or-nothing guarantees.
#[derive(Debug, Default)]
pub struct NullEffects {
    applied: Vec<ActionKey>,
    reject: bool,
    fail_apply: bool,
}

impl NullEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys applied so far, in order.
    pub fn applied(&self) -> &[ActionKey] {
        &self.applied
    }

    pub fn set_rejecting(&mut self, reject: bool) {
        self.reject = reject;
    }

    pub fn set_failing(&mut self, fail: bool) {
        self.fail_apply = fail;
    }
}

impl DomainEffects for NullEffects {
    fn validate(&self, key: &ActionKey) -> Result<(), ActionError> {
        if self.reject {
            return Err(ActionError::Rejected(format!("{key} rejected")));
        }
        Ok(())
    }

    fn apply(&mut self, key: &ActionKey) -> Result<(), ActionError> {
        if self.fail_apply {
            return Err(ActionError::Rejected(format!("{key} reverted")));
        }
        self.applied.push(*key);
        Ok(())
    }
}
