//! Account and registry addresses.
//!
//! # Invariants
//! - An address is exactly 20 bytes.
//! - Canonical text form is lowercase `0x`-prefixed hex; parsing accepts any
//!   letter case.

use crate::model::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0[xX][0-9a-fA-F]{40}$").expect("valid address regex"));

/// 20-byte account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address, used as mint source and burn sink.
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Parses a `0x`-prefixed, 40 hex digit address.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if !ADDRESS_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidAddress(trimmed.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&trimmed[2..], &mut bytes)
            .map_err(|_| ValidationError::InvalidAddress(trimmed.to_string()))?;
        Ok(Self(bytes))
    }

    /// Derives the address of the `nonce`-th registry deployed by `deployer`.
    ///
    /// Takes the trailing 20 bytes of `sha256(deployer || nonce_be)`.
    pub fn derive_registry(deployer: &Address, nonce: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(deployer.0);
        hasher.update(nonce.to_be_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..32]);
        Self(bytes)
    }

    /// Short display form `0x1234...abcd` used by client surfaces.
    pub fn abbreviated(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::Address;

    #[test]
    fn parses_mixed_case_and_renders_lowercase() {
        let address = Address::parse("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
            .expect("checksummed address should parse");
        assert_eq!(
            address.to_string(),
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
    }

    #[test]
    fn rejects_wrong_length_and_missing_prefix() {
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("70997970c51812dc3a010c7d01b50e0d17dc79c8").is_err());
        assert!(Address::parse("0xZZ997970c51812dc3a010c7d01b50e0d17dc79c8").is_err());
    }

    #[test]
    fn registry_derivation_is_deterministic_and_nonce_sensitive() {
        let deployer = Address::from_bytes([7u8; 20]);
        let first = Address::derive_registry(&deployer, 1);
        assert_eq!(first, Address::derive_registry(&deployer, 1));
        assert_ne!(first, Address::derive_registry(&deployer, 2));
        assert!(!first.is_zero());
    }

    #[test]
    fn abbreviated_keeps_prefix_and_suffix() {
        let address = Address::parse("0x1234567890123456789012345678901234567890")
            .expect("address should parse");
        assert_eq!(address.abbreviated(), "0x1234...7890");
    }
}
