//! Fee registry: bounded fee parameters under supermajority control.

use quorate_governance::{
    ActionError, DelegateDirectory, DomainEffects, Genesis, GovernanceConfig, GovernanceError,
};
use quorate_types::{ActionKey, ActionType, Parameter};
use serde::{Deserialize, Serialize};

use crate::instance::Instance;

/// Upper bound on the fee share, in basis points.
pub const MAX_FEE_SHARE_BPS: u64 = 10_000;

/// The parameters a fee registry governs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Flat fee per registry operation. Never zero.
    pub base_fee: u64,
    /// Upper bound on sponsored gas per transaction.
    pub sponsorship_cap: u64,
    /// Share of collected fees routed to the fee vault.
    pub fee_share_bps: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: 1_000,
            sponsorship_cap: 1_000_000,
            fee_share_bps: 500,
        }
    }
}

impl FeeSchedule {
    pub fn get(&self, param: Parameter) -> u64 {
        match param {
            Parameter::BaseFee => self.base_fee,
            Parameter::SponsorshipCap => self.sponsorship_cap,
            Parameter::FeeShareBps => self.fee_share_bps,
        }
    }

    fn slot(&mut self, param: Parameter) -> &mut u64 {
        match param {
            Parameter::BaseFee => &mut self.base_fee,
            Parameter::SponsorshipCap => &mut self.sponsorship_cap,
            Parameter::FeeShareBps => &mut self.fee_share_bps,
        }
    }

    fn check_bounds(param: Parameter, value: u64) -> Result<(), ActionError> {
        match param {
            Parameter::BaseFee if value == 0 => {
                Err(ActionError::Rejected("base fee must be non-zero".into()))
            }
            Parameter::FeeShareBps if value > MAX_FEE_SHARE_BPS => Err(ActionError::OutOfBounds {
                name: param.name(),
                value,
                max: MAX_FEE_SHARE_BPS,
            }),
            _ => Ok(()),
        }
    }

    fn proposed(key: &ActionKey) -> Result<(Parameter, u64), ActionError> {
        match (key.action, key.target.as_value()) {
            (ActionType::SetParameter(param), Some(value)) => Ok((param, value)),
            _ => Err(ActionError::Unsupported(key.action.to_string())),
        }
    }
}

impl DomainEffects for FeeSchedule {
    fn validate(&self, key: &ActionKey) -> Result<(), ActionError> {
        let (param, value) = Self::proposed(key)?;
        Self::check_bounds(param, value)?;
        if self.get(param) == value {
            return Err(ActionError::AlreadyApplied(format!(
                "{} is already {value}",
                param.name()
            )));
        }
        Ok(())
    }

    fn apply(&mut self, key: &ActionKey) -> Result<(), ActionError> {
        self.validate(key)?;
        let (param, value) = Self::proposed(key)?;
        let previous = std::mem::replace(self.slot(param), value);
        tracing::info!(parameter = param.name(), previous, value, "fee parameter updated");
        Ok(())
    }
}

/// Overlords change fee parameters by supermajority.
pub type FeeRegistry = Instance<FeeSchedule>;

impl Instance<FeeSchedule> {
    pub fn fee_registry(
        genesis: &Genesis,
        directory: Box<dyn DelegateDirectory>,
        schedule: FeeSchedule,
    ) -> Result<Self, GovernanceError> {
        Self::new(GovernanceConfig::fee_registry(), genesis, directory, schedule)
    }

    pub fn schedule(&self) -> &FeeSchedule {
        self.effects()
    }
}
