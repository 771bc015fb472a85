//! Canonical Primitive Types
//!
//! These types are the foundational building blocks for the store, token and
//! sale state. They are designed to be:
//! - Fixed-size (no dynamic allocation)
//! - Deterministically serializable
//! - Cheap to copy and compare

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Value and token amounts in their smallest unit
pub type Amount = u128;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Smallest value units per whole "ether"
pub const WEI_PER_ETHER: Amount = 1_000_000_000_000_000_000;

/// `n` whole ether expressed in wei
pub const fn ether(n: u64) -> Amount {
    n as Amount * WEI_PER_ETHER
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// 32-byte address of an account, contract or store
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
pub struct Address(pub [u8; 32]);

/// Failure to parse an [`Address`] from text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl Address {
    /// Create a new Address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a zeroed Address
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse from 64 hex characters, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }

    /// Full lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_basics() {
        let addr = Address::new([3u8; 32]);
        assert!(!addr.is_zero());
        assert_eq!(addr.as_bytes(), &[3u8; 32]);
        assert!(Address::zero().is_zero());
    }

    #[test]
    fn test_address_hex_parsing() {
        let addr = Address::new([0xab; 32]);
        let text = addr.to_hex();
        assert_eq!(text.len(), 64);
        assert_eq!(Address::from_hex(&text).unwrap(), addr);
        assert_eq!(format!("0x{}", text).parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_address_hex_rejects_bad_input() {
        assert!(matches!(
            Address::from_hex("zz"),
            Err(AddressParseError::InvalidHex(_))
        ));
        assert_eq!(
            Address::from_hex("abcd"),
            Err(AddressParseError::InvalidLength(2))
        );
    }

    #[test]
    fn test_address_ordering_follows_bytes() {
        let low = Address::new([1u8; 32]);
        let high = Address::new([2u8; 32]);
        assert!(low < high);
    }

    #[test]
    fn test_ether_units() {
        assert_eq!(ether(0), 0);
        assert_eq!(ether(1), WEI_PER_ETHER);
        assert_eq!(ether(100), 100 * WEI_PER_ETHER);
    }
}
