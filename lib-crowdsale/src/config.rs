//! Sale Configuration
//!
//! Parameters fixed at construction, loaded from TOML:
//!
//! ```toml
//! rate = 1
//! cap = "100 ether"
//! wallet = "0x7777777777777777777777777777777777777777777777777777777777777777"
//! token = "1111111111111111111111111111111111111111111111111111111111111111"
//! token_source = "0x5555555555555555555555555555555555555555555555555555555555555555"
//! opening_time = 1700604800
//! closing_time = 1701209600
//! ```
//!
//! TOML integers stop at `i64`, so amounts also accept decimal strings,
//! optionally suffixed with `ether`.

use std::path::Path;

use lib_types::{Address, Amount, Timestamp, WEI_PER_ETHER};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Wei per token unit
    #[serde(with = "amount_serde")]
    pub rate: Amount,
    /// Receives every contribution
    #[serde(with = "address_serde")]
    pub wallet: Address,
    /// Address of the token front
    #[serde(with = "address_serde")]
    pub token: Address,
    /// Holder that pre-approves the sale for withdrawals
    #[serde(with = "address_serde")]
    pub token_source: Address,
    /// Aggregate wei cap
    #[serde(with = "amount_serde")]
    pub cap: Amount,
    pub opening_time: Timestamp,
    pub closing_time: Timestamp,
}

impl SaleConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Reject configs that could never run a sale
    pub fn validate(&self, now: Timestamp) -> Result<(), ConfigError> {
        if self.rate == 0 {
            return Err(ConfigError::InvalidRate);
        }
        if self.cap == 0 {
            return Err(ConfigError::InvalidCap);
        }
        if self.opening_time >= self.closing_time {
            return Err(ConfigError::InvalidWindow {
                opening: self.opening_time,
                closing: self.closing_time,
            });
        }
        if self.opening_time < now {
            return Err(ConfigError::OpeningInPast {
                opening: self.opening_time,
                now,
            });
        }
        for (name, address) in [
            ("wallet", &self.wallet),
            ("token", &self.token),
            ("token_source", &self.token_source),
        ] {
            if address.is_zero() {
                return Err(ConfigError::ZeroAddress(name));
            }
        }
        Ok(())
    }
}

/// Parse `"123"`, `"1_000"` or `"100 ether"` into wei
pub fn parse_amount(input: &str) -> Result<Amount, ConfigError> {
    let cleaned: String = input.trim().chars().filter(|c| *c != '_').collect();
    let (digits, multiplier) = match cleaned.strip_suffix("ether") {
        Some(rest) => (rest.trim_end(), WEI_PER_ETHER),
        None => (cleaned.as_str(), 1),
    };

    let value: Amount = digits
        .parse()
        .map_err(|_| ConfigError::InvalidAmount(input.to_string()))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| ConfigError::InvalidAmount(input.to_string()))
}

mod amount_serde {
    use super::{parse_amount, Amount};
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Int(u64),
        Str(String),
    }

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        match RawAmount::deserialize(deserializer)? {
            RawAmount::Int(value) => Ok(Amount::from(value)),
            RawAmount::Str(value) => parse_amount(&value).map_err(de::Error::custom),
        }
    }
}

mod address_serde {
    use lib_types::Address;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", value.to_hex()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_hex(&raw).map_err(de::Error::custom)
    }
}
