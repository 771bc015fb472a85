//! Storage error types

use lib_types::Address;
use thiserror::Error;

/// Storage layer result type
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the eternal store and its admin gate
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unauthorized: {caller} may not {action}")]
    Unauthorized { caller: Address, action: &'static str },

    #[error("Key is reserved for the store itself: {0}")]
    ReservedKey(String),

    #[error("Empty keys are not allowed")]
    EmptyKey,

    #[error("Invalid value at {key}: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },

    #[error("Store is already initialized")]
    AlreadyInitialized,

    #[error("Store is not initialized")]
    NotInitialized,

    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Render a key for error messages: UTF-8 prefix where printable, hex otherwise
pub(crate) fn describe_key(key: &[u8]) -> String {
    let printable = key
        .iter()
        .take_while(|b| b.is_ascii_graphic())
        .count();
    let (head, tail) = key.split_at(printable);
    let mut out = String::from_utf8_lossy(head).into_owned();
    if !tail.is_empty() {
        out.push_str(&hex_prefix(tail));
    }
    out
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}
