//! Principal identifiers (address-equivalent).

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// An opaque 20-byte actor identity, rendered as `0x`-prefixed hex.
///
/// The all-zero value is the null principal: it never holds a role and is
/// never a valid proposal target.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal([u8; 20]);

impl Principal {
    pub const LEN: usize = 20;

    /// The null principal.
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive a principal from a human-readable label.
    ///
    /// Takes the first 20 bytes of `Blake2b-256(label)`. Used by scenario
    /// files and tests to name actors without spelling out hex.
    pub fn derive(label: &str) -> Self {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(label.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal(0x{})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Principal {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded =
            hex::decode(raw).map_err(|e| TypesError::InvalidPrincipal(format!("{s}: {e}")))?;
        let bytes: [u8; 20] = decoded.try_into().map_err(|v: Vec<u8>| {
            TypesError::InvalidPrincipal(format!("{s}: expected 20 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Principal {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parses_back() {
        let p = Principal::derive("alice");
        let text = p.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 42);
        assert_eq!(text.parse::<Principal>().unwrap(), p);
    }

    #[test]
    fn parse_without_prefix() {
        let p: Principal = "0101010101010101010101010101010101010101".parse().unwrap();
        assert_eq!(p, Principal::new([1u8; 20]));
    }

    #[test]
    fn wrong_length_rejected() {
        let err = "0xdeadbeef".parse::<Principal>().unwrap_err();
        assert!(matches!(err, TypesError::InvalidPrincipal(_)));
    }

    #[test]
    fn non_hex_rejected() {
        assert!("0xzz".parse::<Principal>().is_err());
    }

    #[test]
    fn derive_is_deterministic_and_distinct() {
        assert_eq!(Principal::derive("bob"), Principal::derive("bob"));
        assert_ne!(Principal::derive("bob"), Principal::derive("carol"));
        assert!(!Principal::derive("bob").is_zero());
    }

    #[test]
    fn zero_is_null() {
        assert!(Principal::ZERO.is_zero());
    }
}
