//! Sale and token primitives.
//! Stable, behavior-free.
//!
//! Rule: every account, contract and store is identified by a 32-byte
//! [`Address`]. No string identifiers in ledger state.

pub mod primitives;

pub use primitives::{ether, Address, AddressParseError, Amount, Timestamp, WEI_PER_ETHER};
