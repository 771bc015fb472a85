//! Token Errors

use lib_storage::StorageError;
use lib_types::{Address, Amount};
use thiserror::Error;

/// Error during token operations
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("Invalid recipient: zero address")]
    InvalidRecipient,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Token front has no implementation")]
    NoImplementation,

    #[error("Implementation {0} is already current")]
    SameImplementation(Address),

    #[error("Implementation bound to storage {actual}, front is pinned to {expected}")]
    StorageMismatch { expected: Address, actual: Address },

    #[error("Implementation supports schema v{supported}, storage is v{found}")]
    IncompatibleSchema { supported: u32, found: u32 },

    #[error("Operation not supported by this logic version: {0}")]
    Unsupported(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;
