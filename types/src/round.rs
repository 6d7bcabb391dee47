//! Epochs and round identifiers.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::action::ActionKey;

type Blake2b256 = Blake2b<U32>;

/// Global, monotonically increasing governance version.
///
/// Bumped by every executed proposal and every direct mutation; a bump
/// invalidates every round opened under the previous epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    pub const GENESIS: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A 32-byte voting round identifier.
///
/// `Blake2b-256(epoch || action code || target encoding || round number)`.
/// Rounds are never stored by key alone; the id changes whenever the epoch or
/// the round number does.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId([u8; 32]);

impl RoundId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn derive(epoch: Epoch, key: &ActionKey, round_number: u64) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(epoch.as_u64().to_le_bytes());
        hasher.update(key.action.code());
        hasher.update(key.target.encode());
        hasher.update(round_number.to_le_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoundId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
