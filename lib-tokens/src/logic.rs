//! Token Logic Versions
//!
//! A logic version is the replaceable half of the token: it owns no ledger
//! state of its own, only a handle to the shared [`EternalStorage`] and its
//! own immutable configuration. Swapping versions behind a
//! [`TokenFront`](crate::TokenFront) therefore never moves a balance.

use std::sync::Arc;

use lib_storage::{EternalStorage, KeyValueBackend, MemoryBackend, SCHEMA_VERSION};
use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{TokenError, TokenResult};
use crate::token_lib;

/// Fungible token surface used by contracts and holders
///
/// `caller` is always the account on whose behalf the call is made.
pub trait Erc20: Send + Sync {
    fn address(&self) -> Address;
    fn total_supply(&self) -> TokenResult<Amount>;
    fn balance_of(&self, owner: &Address) -> TokenResult<Amount>;
    fn allowance(&self, owner: &Address, spender: &Address) -> TokenResult<Amount>;
    fn transfer(&self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()>;
    fn approve(&self, caller: &Address, spender: &Address, amount: Amount) -> TokenResult<()>;
    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()>;
}

/// A swappable implementation that can sit behind a token front
pub trait TokenLogic: Erc20 {
    /// Version tag, e.g. `"1.0"`
    fn version(&self) -> &str;

    fn metadata(&self) -> &TokenMetadata;

    /// Address of the store this logic reads and writes
    fn storage_address(&self) -> Address;

    /// Schema version this logic understands
    fn supported_schema(&self) -> u32 {
        SCHEMA_VERSION
    }

    /// Schema version stamped in the bound store
    fn schema_version(&self) -> TokenResult<u32>;

    /// Create tokens. Restricted to the logic owner.
    fn mint(&self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()>;

    /// Destroy the caller's tokens
    fn burn(&self, _caller: &Address, _amount: Amount) -> TokenResult<()> {
        Err(TokenError::Unsupported("burn"))
    }
}

/// Display metadata of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMetadata {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        }
    }
}

// ============================================================================
// StandardToken
// ============================================================================

/// Mint/transfer/approve logic over eternal storage
///
/// The logic must be granted admin on the store before it can write.
#[derive(Debug, Clone)]
pub struct StandardToken<B: KeyValueBackend = MemoryBackend> {
    address: Address,
    owner: Address,
    version: String,
    metadata: TokenMetadata,
    store: Arc<EternalStorage<B>>,
}

impl<B: KeyValueBackend> StandardToken<B> {
    pub fn new(
        owner: Address,
        address: Address,
        metadata: TokenMetadata,
        store: Arc<EternalStorage<B>>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            address,
            owner,
            version: version.into(),
            metadata,
            store,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn store(&self) -> &Arc<EternalStorage<B>> {
        &self.store
    }

    fn ledger(&self) -> &EternalStorage<B> {
        &self.store
    }
}

impl<B: KeyValueBackend> Erc20 for StandardToken<B> {
    fn address(&self) -> Address {
        self.address
    }

    fn total_supply(&self) -> TokenResult<Amount> {
        token_lib::total_supply(self.ledger())
    }

    fn balance_of(&self, owner: &Address) -> TokenResult<Amount> {
        token_lib::balance_of(self.ledger(), owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> TokenResult<Amount> {
        token_lib::allowance(self.ledger(), owner, spender)
    }

    fn transfer(&self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        token_lib::transfer(self.ledger(), &self.address, caller, to, amount)
    }

    fn approve(&self, caller: &Address, spender: &Address, amount: Amount) -> TokenResult<()> {
        token_lib::approve(self.ledger(), &self.address, caller, spender, amount)
    }

    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        token_lib::transfer_from(self.ledger(), &self.address, caller, from, to, amount)
    }
}

impl<B: KeyValueBackend> TokenLogic for StandardToken<B> {
    fn version(&self) -> &str {
        &self.version
    }

    fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    fn storage_address(&self) -> Address {
        self.store.address()
    }

    fn schema_version(&self) -> TokenResult<u32> {
        Ok(self.store.schema_version()?)
    }

    fn mint(&self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        if *caller != self.owner {
            warn!("{} v{}: mint rejected for {}", self.metadata.symbol, self.version, caller);
            return Err(TokenError::Unauthorized(format!(
                "{} is not the owner of logic {}",
                caller, self.address
            )));
        }
        token_lib::mint(self.ledger(), &self.address, to, amount)?;
        info!("{} v{}: minted {} to {}", self.metadata.symbol, self.version, amount, to);
        Ok(())
    }
}

// ============================================================================
// BurnableToken
// ============================================================================

/// [`StandardToken`] plus holder-initiated burn
#[derive(Debug, Clone)]
pub struct BurnableToken<B: KeyValueBackend = MemoryBackend> {
    inner: StandardToken<B>,
}

impl<B: KeyValueBackend> BurnableToken<B> {
    pub fn new(
        owner: Address,
        address: Address,
        metadata: TokenMetadata,
        store: Arc<EternalStorage<B>>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            inner: StandardToken::new(owner, address, metadata, store, version),
        }
    }
}

impl<B: KeyValueBackend> Erc20 for BurnableToken<B> {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn total_supply(&self) -> TokenResult<Amount> {
        self.inner.total_supply()
    }

    fn balance_of(&self, owner: &Address) -> TokenResult<Amount> {
        self.inner.balance_of(owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> TokenResult<Amount> {
        self.inner.allowance(owner, spender)
    }

    fn transfer(&self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        self.inner.transfer(caller, to, amount)
    }

    fn approve(&self, caller: &Address, spender: &Address, amount: Amount) -> TokenResult<()> {
        self.inner.approve(caller, spender, amount)
    }

    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        self.inner.transfer_from(caller, from, to, amount)
    }
}

impl<B: KeyValueBackend> TokenLogic for BurnableToken<B> {
    fn version(&self) -> &str {
        self.inner.version()
    }

    fn metadata(&self) -> &TokenMetadata {
        self.inner.metadata()
    }

    fn storage_address(&self) -> Address {
        self.inner.storage_address()
    }

    fn schema_version(&self) -> TokenResult<u32> {
        self.inner.schema_version()
    }

    fn mint(&self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        self.inner.mint(caller, to, amount)
    }

    fn burn(&self, caller: &Address, amount: Amount) -> TokenResult<()> {
        token_lib::burn(self.inner.ledger(), &self.inner.address, caller, amount)?;
        info!(
            "{} v{}: {} burned {}",
            self.inner.metadata.symbol, self.inner.version, caller, amount
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address::new([1u8; 32]);
    const STORE: Address = Address::new([2u8; 32]);
    const LOGIC: Address = Address::new([3u8; 32]);
    const ALICE: Address = Address::new([0xa1; 32]);

    fn metadata() -> TokenMetadata {
        TokenMetadata::new("Hyperbridge Token", "HBX", 18)
    }

    fn store() -> Arc<EternalStorage> {
        let store = EternalStorage::in_memory(OWNER, STORE).unwrap();
        store.add_admin(&OWNER, &LOGIC).unwrap();
        Arc::new(store)
    }

    #[test]
    fn test_standard_token_accessors() {
        let token = StandardToken::new(OWNER, LOGIC, metadata(), store(), "1.0");
        assert_eq!(token.address(), LOGIC);
        assert_eq!(token.version(), "1.0");
        assert_eq!(token.storage_address(), STORE);
        assert_eq!(token.metadata().decimals, 18);
        assert_eq!(token.schema_version().unwrap(), token.supported_schema());
    }

    #[test]
    fn test_mint_owner_only() {
        let token = StandardToken::new(OWNER, LOGIC, metadata(), store(), "1.0");
        let result = token.mint(&ALICE, &ALICE, 10);
        assert!(matches!(result, Err(TokenError::Unauthorized(_))));

        token.mint(&OWNER, &ALICE, 10).unwrap();
        assert_eq!(token.balance_of(&ALICE).unwrap(), 10);
    }

    #[test]
    fn test_standard_token_cannot_burn() {
        let token = StandardToken::new(OWNER, LOGIC, metadata(), store(), "1.0");
        token.mint(&OWNER, &ALICE, 10).unwrap();
        assert!(matches!(token.burn(&ALICE, 1), Err(TokenError::Unsupported("burn"))));
    }

    #[test]
    fn test_burnable_token_burns_callers_tokens() {
        let token = BurnableToken::new(OWNER, LOGIC, metadata(), store(), "2.0");
        token.mint(&OWNER, &ALICE, 10).unwrap();
        token.burn(&ALICE, 4).unwrap();
        assert_eq!(token.balance_of(&ALICE).unwrap(), 6);
        assert_eq!(token.total_supply().unwrap(), 6);
    }
}
