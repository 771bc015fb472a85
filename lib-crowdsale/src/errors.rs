//! Crowdsale Errors

use std::fmt;

use lib_tokens::TokenError;
use lib_types::{Address, Amount, Timestamp};
use thiserror::Error;

use crate::cap_ledger::GroupId;

/// Which limit a rejected contribution ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapScope {
    Individual(Address),
    Group(GroupId),
    Sale,
}

impl fmt::Display for CapScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapScope::Individual(addr) => write!(f, "user {}", addr),
            CapScope::Group(id) => write!(f, "{}", id),
            CapScope::Sale => write!(f, "sale"),
        }
    }
}

/// Error during sale operations
#[derive(Error, Debug)]
pub enum SaleError {
    #[error("Sale not open at {now} (window {opening}..={closing})")]
    SaleNotOpen {
        now: Timestamp,
        opening: Timestamp,
        closing: Timestamp,
    },

    #[error("Cap exceeded for {scope}: cap {cap}, contributed {contributed}, attempted {attempted}")]
    CapExceeded {
        scope: CapScope,
        cap: Amount,
        contributed: Amount,
        attempted: Amount,
    },

    #[error("Unauthorized: {caller} may not {action}")]
    Unauthorized { caller: Address, action: &'static str },

    #[error("Sale not closed at {now} (closes after {closing})")]
    SaleNotClosed { now: Timestamp, closing: Timestamp },

    #[error("Tokens already withdrawn by {0}")]
    AlreadyWithdrawn(Address),

    #[error("Insufficient allowance from token source: available {available}, owed {owed}")]
    InsufficientAllowance { available: Amount, owed: Amount },

    #[error("Nothing to withdraw for {0}")]
    NothingToWithdraw(Address),

    #[error("Purchase of {value} wei yields no tokens at rate {rate}")]
    ZeroPurchase { value: Amount, rate: Amount },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Funds transfer failed: {0}")]
    Funds(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// Error while loading or validating a [`SaleConfig`](crate::SaleConfig)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Rate must be greater than zero")]
    InvalidRate,

    #[error("Cap must be greater than zero")]
    InvalidCap,

    #[error("Opening time {opening} must be before closing time {closing}")]
    InvalidWindow { opening: Timestamp, closing: Timestamp },

    #[error("Opening time {opening} is before current time {now}")]
    OpeningInPast { opening: Timestamp, now: Timestamp },

    #[error("{0} must not be the zero address")]
    ZeroAddress(&'static str),

    #[error("Token handle is {actual}, config names {expected}")]
    TokenMismatch { expected: Address, actual: Address },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for sale operations
pub type SaleResult<T> = Result<T, SaleError>;
