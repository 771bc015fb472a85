//! Token Front
//!
//! The stable, externally addressed token. Holders and contracts keep one
//! handle to the front; the front forwards every call to whichever
//! [`TokenLogic`] it currently points at.
//!
//! # Upgrade rules
//!
//! - Only the front owner may re-point it
//! - Re-pointing to the current implementation is rejected
//! - The first upgrade pins the store address; later implementations must be
//!   bound to that same store
//! - The implementation must understand the store's schema version
//!
//! The new implementation must already be an admin of the store, otherwise
//! its writes fail with `Unauthorized` from the storage layer. Revoking the
//! previous implementation is the store owner's job.

use std::fmt;
use std::sync::Arc;

use lib_types::{Address, Amount};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::errors::{TokenError, TokenResult};
use crate::logic::{Erc20, TokenLogic};

/// Where the front currently forwards to
#[derive(Clone)]
pub struct UpgradePointer {
    pub implementation: Arc<dyn TokenLogic>,
    pub address: Address,
    pub version: String,
    pub storage: Address,
}

impl fmt::Debug for UpgradePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradePointer")
            .field("address", &self.address)
            .field("version", &self.version)
            .field("storage", &self.storage)
            .finish()
    }
}

/// One accepted upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRecord {
    pub from: Option<Address>,
    pub to: Address,
    pub version: String,
}

#[derive(Debug)]
pub struct TokenFront {
    address: Address,
    owner: RwLock<Address>,
    pointer: RwLock<Option<UpgradePointer>>,
    history: RwLock<Vec<UpgradeRecord>>,
}

impl TokenFront {
    pub fn new(owner: Address, address: Address) -> Self {
        Self {
            address,
            owner: RwLock::new(owner),
            pointer: RwLock::new(None),
            history: RwLock::new(Vec::new()),
        }
    }

    pub fn owner(&self) -> Address {
        *self.owner.read()
    }

    pub fn transfer_ownership(&self, caller: &Address, new_owner: Address) -> TokenResult<()> {
        let mut owner = self.owner.write();
        if *caller != *owner {
            warn!("Token front {}: ownership transfer rejected for {}", self.address, caller);
            return Err(TokenError::Unauthorized(format!(
                "{} is not the owner of front {}",
                caller, self.address
            )));
        }
        info!("Token front {}: ownership {} -> {}", self.address, *owner, new_owner);
        *owner = new_owner;
        Ok(())
    }

    /// Point the front at `implementation`
    pub fn upgrade_to(
        &self,
        caller: &Address,
        implementation: Arc<dyn TokenLogic>,
    ) -> TokenResult<()> {
        if *caller != self.owner() {
            warn!("Token front {}: upgrade rejected for {}", self.address, caller);
            return Err(TokenError::Unauthorized(format!(
                "{} is not the owner of front {}",
                caller, self.address
            )));
        }

        let mut pointer = self.pointer.write();
        let new_address = implementation.address();
        let storage = implementation.storage_address();

        if let Some(current) = pointer.as_ref() {
            if current.address == new_address {
                return Err(TokenError::SameImplementation(new_address));
            }
            if current.storage != storage {
                return Err(TokenError::StorageMismatch {
                    expected: current.storage,
                    actual: storage,
                });
            }
        }

        let supported = implementation.supported_schema();
        let found = implementation.schema_version()?;
        if supported != found {
            return Err(TokenError::IncompatibleSchema { supported, found });
        }

        let previous = pointer.as_ref().map(|p| p.address);
        let version = implementation.version().to_string();
        info!(
            "Token front {}: upgraded {} -> {} (v{}, storage {})",
            self.address,
            previous.map(|a| a.to_string()).unwrap_or_else(|| "none".to_string()),
            new_address,
            version,
            storage
        );

        self.history.write().push(UpgradeRecord {
            from: previous,
            to: new_address,
            version: version.clone(),
        });
        *pointer = Some(UpgradePointer {
            implementation,
            address: new_address,
            version,
            storage,
        });
        Ok(())
    }

    /// Address of the current implementation
    pub fn implementation(&self) -> Option<Address> {
        self.pointer.read().as_ref().map(|p| p.address)
    }

    pub fn version(&self) -> Option<String> {
        self.pointer.read().as_ref().map(|p| p.version.clone())
    }

    /// Store address pinned by the first upgrade
    pub fn storage(&self) -> Option<Address> {
        self.pointer.read().as_ref().map(|p| p.storage)
    }

    pub fn history(&self) -> Vec<UpgradeRecord> {
        self.history.read().clone()
    }

    pub fn mint(&self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        self.current()?.mint(caller, to, amount)
    }

    pub fn burn(&self, caller: &Address, amount: Amount) -> TokenResult<()> {
        self.current()?.burn(caller, amount)
    }

    // The lock is released before the call is forwarded.
    fn current(&self) -> TokenResult<Arc<dyn TokenLogic>> {
        self.pointer
            .read()
            .as_ref()
            .map(|p| Arc::clone(&p.implementation))
            .ok_or(TokenError::NoImplementation)
    }
}

impl Erc20 for TokenFront {
    fn address(&self) -> Address {
        self.address
    }

    fn total_supply(&self) -> TokenResult<Amount> {
        self.current()?.total_supply()
    }

    fn balance_of(&self, owner: &Address) -> TokenResult<Amount> {
        self.current()?.balance_of(owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> TokenResult<Amount> {
        self.current()?.allowance(owner, spender)
    }

    fn transfer(&self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        self.current()?.transfer(caller, to, amount)
    }

    fn approve(&self, caller: &Address, spender: &Address, amount: Amount) -> TokenResult<()> {
        self.current()?.approve(caller, spender, amount)
    }

    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        self.current()?.transfer_from(caller, from, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{StandardToken, TokenMetadata};
    use lib_storage::EternalStorage;

    const OWNER: Address = Address::new([1u8; 32]);
    const FRONT: Address = Address::new([5u8; 32]);

    #[test]
    fn test_calls_before_first_upgrade_fail() {
        let front = TokenFront::new(OWNER, FRONT);
        assert!(matches!(front.total_supply(), Err(TokenError::NoImplementation)));
        assert!(matches!(
            front.transfer(&OWNER, &FRONT, 1),
            Err(TokenError::NoImplementation)
        ));
        assert_eq!(front.implementation(), None);
        assert_eq!(front.version(), None);
    }

    #[test]
    fn test_transfer_ownership() {
        let front = TokenFront::new(OWNER, FRONT);
        let next = Address::new([7u8; 32]);

        assert!(front.transfer_ownership(&next, next).is_err());
        front.transfer_ownership(&OWNER, next).unwrap();
        assert_eq!(front.owner(), next);
    }

    #[test]
    fn test_upgrade_records_history() {
        let store = Arc::new(EternalStorage::in_memory(OWNER, Address::new([2u8; 32])).unwrap());
        let logic = Arc::new(StandardToken::new(
            OWNER,
            Address::new([3u8; 32]),
            TokenMetadata::new("T", "T", 0),
            store,
            "1.0",
        ));

        let front = TokenFront::new(OWNER, FRONT);
        front.upgrade_to(&OWNER, logic).unwrap();

        let history = front.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from, None);
        assert_eq!(history[0].to, Address::new([3u8; 32]));
        assert_eq!(front.version().as_deref(), Some("1.0"));
    }
}
