//! Upgradeable Token
//!
//! A token split into a stable front and replaceable logic, with every
//! balance held in an [`lib_storage::EternalStorage`].
//!
//! # Key Types
//!
//! - [`TokenFront`]: The stable address holders and contracts talk to
//! - [`TokenLogic`]: A swappable implementation ([`StandardToken`], [`BurnableToken`])
//! - [`Erc20`]: The fungible token surface both of them expose
//!
//! # Ledger
//!
//! All reads and writes go through [`token_lib`] using the key layout in
//! [`keys`], so an upgrade never migrates data.

pub mod errors;
pub mod front;
pub mod keys;
pub mod logic;
pub mod token_lib;

pub use errors::*;
pub use front::{TokenFront, UpgradePointer, UpgradeRecord};
pub use logic::{BurnableToken, Erc20, StandardToken, TokenLogic, TokenMetadata};
