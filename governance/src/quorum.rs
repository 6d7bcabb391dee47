//! Quorum policy: how many votes a live electorate needs.
//!
//! The threshold is a pure function of the current effective member count.
//! The engine re-evaluates it on every vote, so a round can move into or out
//! of reach when the electorate changes mid-round.

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// `ceil(n * numerator / denominator)`.
///
/// A zero denominator yields `u64::MAX` (unreachable); configurations are
/// validated so the engine never evaluates one.
pub fn threshold(n: u64, numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return u64::MAX;
    }
    let product = n as u128 * numerator as u128;
    let required = product.div_ceil(denominator as u128);
    u64::try_from(required).unwrap_or(u64::MAX)
}

/// Configured quorum rule for one governance instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuorumPolicy {
    /// `floor(n / 2) + 1`.
    #[default]
    SimpleMajority,
    /// `ceil(2n / 3)`.
    Supermajority,
    /// `ceil(n * numerator / denominator)`.
    Fraction { numerator: u64, denominator: u64 },
}

impl QuorumPolicy {
    /// Minimum votes required from an electorate of `members`.
    ///
    /// Never below 1: an empty electorate cannot pass anything.
    pub fn threshold(&self, members: usize) -> u64 {
        let n = members as u64;
        let required = match self {
            Self::SimpleMajority => n / 2 + 1,
            Self::Supermajority => threshold(n, 2, 3),
            Self::Fraction {
                numerator,
                denominator,
            } => threshold(n, *numerator, *denominator),
        };
        required.max(1)
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        if let Self::Fraction {
            numerator,
            denominator,
        } = self
        {
            if *denominator == 0 {
                return Err(GovernanceError::Config(
                    "quorum denominator must be non-zero".into(),
                ));
            }
            if *numerator == 0 || numerator > denominator {
                return Err(GovernanceError::Config(format!(
                    "quorum fraction {numerator}/{denominator} must lie in (0, 1]"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_fraction() {
        assert_eq!(threshold(3, 2, 3), 2);
        assert_eq!(threshold(4, 2, 3), 3);
        assert_eq!(threshold(6, 2, 3), 4);
        assert_eq!(threshold(7, 1, 2), 4);
        assert_eq!(threshold(0, 2, 3), 0);
    }

    #[test]
    fn zero_denominator_is_unreachable() {
        assert_eq!(threshold(5, 1, 0), u64::MAX);
    }

    #[test]
    fn simple_majority() {
        let q = QuorumPolicy::SimpleMajority;
        assert_eq!(q.threshold(1), 1);
        assert_eq!(q.threshold(2), 2);
        assert_eq!(q.threshold(3), 2);
        assert_eq!(q.threshold(4), 3);
        assert_eq!(q.threshold(5), 3);
    }

    #[test]
    fn supermajority() {
        let q = QuorumPolicy::Supermajority;
        assert_eq!(q.threshold(1), 1);
        assert_eq!(q.threshold(3), 2);
        assert_eq!(q.threshold(4), 3);
        assert_eq!(q.threshold(9), 6);
    }

    #[test]
    fn empty_electorate_needs_one_vote() {
        assert_eq!(QuorumPolicy::Supermajority.threshold(0), 1);
        assert_eq!(
            QuorumPolicy::Fraction {
                numerator: 1,
                denominator: 3
            }
            .threshold(0),
            1
        );
    }

    #[test]
    fn fraction_validation() {
        assert!(QuorumPolicy::SimpleMajority.validate().is_ok());
        assert!(QuorumPolicy::Fraction {
            numerator: 3,
            denominator: 4
        }
        .validate()
        .is_ok());
        assert!(QuorumPolicy::Fraction {
            numerator: 1,
            denominator: 0
        }
        .validate()
        .is_err());
        assert!(QuorumPolicy::Fraction {
            numerator: 5,
            denominator: 4
        }
        .validate()
        .is_err());
    }
}
