//! Ledger Key Encoding
//!
//! Key encoding is PROTOCOL. Every logic version reads and writes the same
//! keys, so this layout must never change once a store holds balances.
//! Never inline key construction in business logic.
//!
//! # Format Conventions
//!
//! - ASCII namespace prefix, then fixed-width 32-byte addresses
//! - Composite keys use fixed-width fields (no delimiters needed)
//! - No key lives under `lib_storage::RESERVED_PREFIX`

use lib_types::Address;

pub const BALANCE_PREFIX: &[u8] = b"balance:";
pub const ALLOWANCE_PREFIX: &[u8] = b"allowance:";
pub const TOTAL_SUPPLY_KEY: &[u8] = b"total_supply";

const BALANCE_KEY_LEN: usize = 8 + 32;
const ALLOWANCE_KEY_LEN: usize = 10 + 64;

/// Key for a holder balance: `balance:` + address
///
/// Layout: [prefix: 8][address: 32] = 40 bytes total
#[inline]
pub fn balance_key(owner: &Address) -> [u8; BALANCE_KEY_LEN] {
    let mut key = [0u8; BALANCE_KEY_LEN];
    key[..8].copy_from_slice(BALANCE_PREFIX);
    key[8..].copy_from_slice(owner.as_bytes());
    key
}

/// Key for an allowance: `allowance:` + owner + spender
///
/// Layout: [prefix: 10][owner: 32][spender: 32] = 74 bytes total
///
/// Prefix scan on `allowance:` + owner lists every spender of one owner.
#[inline]
pub fn allowance_key(owner: &Address, spender: &Address) -> [u8; ALLOWANCE_KEY_LEN] {
    let mut key = [0u8; ALLOWANCE_KEY_LEN];
    key[..10].copy_from_slice(ALLOWANCE_PREFIX);
    key[10..42].copy_from_slice(owner.as_bytes());
    key[42..].copy_from_slice(spender.as_bytes());
    key
}
