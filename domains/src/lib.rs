//! Concrete governance instances built on the threshold engine.
//!
//! Each instance bundles a [`GovernanceEngine`](quorate_governance::GovernanceEngine),
//! the state it governs and the effects its passed actions have:
//!
//! - [`ValidatorAllowList`]: membership only, voters admit validators.
//! - [`FeeRegistry`]: bounded fee parameters changed by supermajority.
//! - [`UpgradeProxy`]: guardians swap the implementation one session at a time.

pub mod allow_list;
pub mod fees;
pub mod instance;
pub mod upgrade;

pub use allow_list::ValidatorAllowList;
pub use fees::{FeeRegistry, FeeSchedule, MAX_FEE_SHARE_BPS};
pub use instance::Instance;
pub use upgrade::{ImplementationSlot, UpgradeProxy};
