//! Token Ledger Functions
//!
//! Stateless balance/allowance/supply operations over an [`EternalStorage`].
//! Every logic version routes through these functions so the ledger layout
//! stays identical across upgrades.
//!
//! Each mutation validates everything first and then writes a single
//! [`StorageBatch`] as `logic`, so a failed call leaves no partial state and
//! a logic that is not an admin of the store cannot write at all.

use lib_storage::{EternalStorage, KeyValueBackend, StorageBatch};
use lib_types::{Address, Amount};
use tracing::debug;

use crate::errors::{TokenError, TokenResult};
use crate::keys::{allowance_key, balance_key, TOTAL_SUPPLY_KEY};

pub fn total_supply<B: KeyValueBackend>(store: &EternalStorage<B>) -> TokenResult<Amount> {
    Ok(store.get_uint(TOTAL_SUPPLY_KEY)?)
}

pub fn balance_of<B: KeyValueBackend>(
    store: &EternalStorage<B>,
    owner: &Address,
) -> TokenResult<Amount> {
    Ok(store.get_uint(balance_key(owner))?)
}

pub fn allowance<B: KeyValueBackend>(
    store: &EternalStorage<B>,
    owner: &Address,
    spender: &Address,
) -> TokenResult<Amount> {
    Ok(store.get_uint(allowance_key(owner, spender))?)
}

/// Move `amount` from `from` to `to`
///
/// A self-transfer only checks the balance; the ledger is unchanged.
pub fn transfer<B: KeyValueBackend>(
    store: &EternalStorage<B>,
    logic: &Address,
    from: &Address,
    to: &Address,
    amount: Amount,
) -> TokenResult<()> {
    let mut batch = StorageBatch::new();
    stage_transfer(store, &mut batch, from, to, amount)?;
    store.commit(logic, batch)?;
    debug!("Token ledger: {} -> {} amount {}", from, to, amount);
    Ok(())
}

/// Set `spender`'s allowance over `owner`'s balance, replacing any prior value
pub fn approve<B: KeyValueBackend>(
    store: &EternalStorage<B>,
    logic: &Address,
    owner: &Address,
    spender: &Address,
    amount: Amount,
) -> TokenResult<()> {
    if spender.is_zero() {
        return Err(TokenError::InvalidRecipient);
    }
    let mut batch = StorageBatch::new();
    batch.set_uint(allowance_key(owner, spender), amount);
    store.commit(logic, batch)?;
    debug!("Token ledger: {} approved {} for {}", owner, spender, amount);
    Ok(())
}

/// Move `amount` from `from` to `to` on behalf of `spender`
///
/// Debits the allowance and both balances in one batch.
pub fn transfer_from<B: KeyValueBackend>(
    store: &EternalStorage<B>,
    logic: &Address,
    spender: &Address,
    from: &Address,
    to: &Address,
    amount: Amount,
) -> TokenResult<()> {
    // =========================================================================
    // Check 1: allowance covers the amount
    // =========================================================================
    let allowed = allowance(store, from, spender)?;
    if allowed < amount {
        return Err(TokenError::InsufficientAllowance {
            have: allowed,
            need: amount,
        });
    }

    // =========================================================================
    // Check 2: balance (staged with the allowance debit)
    // =========================================================================
    let mut batch = StorageBatch::new();
    stage_transfer(store, &mut batch, from, to, amount)?;
    let remaining = allowed.checked_sub(amount).ok_or(TokenError::Underflow)?;
    batch.set_uint(allowance_key(from, spender), remaining);

    store.commit(logic, batch)?;
    debug!(
        "Token ledger: {} moved {} -> {} amount {} (allowance left {})",
        spender, from, to, amount, remaining
    );
    Ok(())
}

/// Create `amount` new tokens for `to`
pub fn mint<B: KeyValueBackend>(
    store: &EternalStorage<B>,
    logic: &Address,
    to: &Address,
    amount: Amount,
) -> TokenResult<()> {
    if to.is_zero() {
        return Err(TokenError::InvalidRecipient);
    }

    let supply = total_supply(store)?
        .checked_add(amount)
        .ok_or(TokenError::Overflow)?;
    let balance = balance_of(store, to)?
        .checked_add(amount)
        .ok_or(TokenError::Overflow)?;

    let mut batch = StorageBatch::new();
    batch
        .set_uint(TOTAL_SUPPLY_KEY, supply)
        .set_uint(balance_key(to), balance);
    store.commit(logic, batch)?;
    debug!("Token ledger: minted {} to {} (supply {})", amount, to, supply);
    Ok(())
}

/// Destroy `amount` of `from`'s tokens
pub fn burn<B: KeyValueBackend>(
    store: &EternalStorage<B>,
    logic: &Address,
    from: &Address,
    amount: Amount,
) -> TokenResult<()> {
    let balance = balance_of(store, from)?;
    if balance < amount {
        return Err(TokenError::InsufficientBalance {
            have: balance,
            need: amount,
        });
    }
    let supply = total_supply(store)?
        .checked_sub(amount)
        .ok_or(TokenError::Underflow)?;

    let mut batch = StorageBatch::new();
    batch
        .set_uint(TOTAL_SUPPLY_KEY, supply)
        .set_uint(balance_key(from), balance - amount);
    store.commit(logic, batch)?;
    debug!("Token ledger: burned {} from {} (supply {})", amount, from, supply);
    Ok(())
}

fn stage_transfer<B: KeyValueBackend>(
    store: &EternalStorage<B>,
    batch: &mut StorageBatch,
    from: &Address,
    to: &Address,
    amount: Amount,
) -> TokenResult<()> {
    if to.is_zero() {
        return Err(TokenError::InvalidRecipient);
    }

    let from_balance = balance_of(store, from)?;
    if from_balance < amount {
        return Err(TokenError::InsufficientBalance {
            have: from_balance,
            need: amount,
        });
    }
    if from == to {
        return Ok(());
    }

    let to_balance = balance_of(store, to)?
        .checked_add(amount)
        .ok_or(TokenError::Overflow)?;
    batch
        .set_uint(balance_key(from), from_balance - amount)
        .set_uint(balance_key(to), to_balance);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_storage::StorageError;

    const OWNER: Address = Address::new([1u8; 32]);
    const STORE: Address = Address::new([2u8; 32]);
    const LOGIC: Address = Address::new([3u8; 32]);
    const ALICE: Address = Address::new([0xa1; 32]);
    const BOB: Address = Address::new([0xb0; 32]);
    const CAROL: Address = Address::new([0xc0; 32]);

    fn funded_store() -> EternalStorage {
        let store = EternalStorage::in_memory(OWNER, STORE).unwrap();
        store.add_admin(&OWNER, &LOGIC).unwrap();
        mint(&store, &LOGIC, &ALICE, 1_000).unwrap();
        store
    }

    #[test]
    fn test_mint_updates_supply_and_balance() {
        let store = funded_store();
        mint(&store, &LOGIC, &BOB, 250).unwrap();

        assert_eq!(total_supply(&store).unwrap(), 1_250);
        assert_eq!(balance_of(&store, &ALICE).unwrap(), 1_000);
        assert_eq!(balance_of(&store, &BOB).unwrap(), 250);
    }

    #[test]
    fn test_mint_to_zero_address_rejected() {
        let store = funded_store();
        let result = mint(&store, &LOGIC, &Address::zero(), 1);
        assert!(matches!(result, Err(TokenError::InvalidRecipient)));
        assert_eq!(total_supply(&store).unwrap(), 1_000);
    }

    #[test]
    fn test_mint_overflow_rejected() {
        let store = funded_store();
        let result = mint(&store, &LOGIC, &BOB, Amount::MAX);
        assert!(matches!(result, Err(TokenError::Overflow)));
        assert_eq!(balance_of(&store, &BOB).unwrap(), 0);
    }

    #[test]
    fn test_transfer_moves_balance() {
        let store = funded_store();
        transfer(&store, &LOGIC, &ALICE, &BOB, 400).unwrap();

        assert_eq!(balance_of(&store, &ALICE).unwrap(), 600);
        assert_eq!(balance_of(&store, &BOB).unwrap(), 400);
        assert_eq!(total_supply(&store).unwrap(), 1_000);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let store = funded_store();
        let result = transfer(&store, &LOGIC, &ALICE, &BOB, 1_001);
        assert!(matches!(
            result,
            Err(TokenError::InsufficientBalance { have: 1_000, need: 1_001 })
        ));
        assert_eq!(balance_of(&store, &BOB).unwrap(), 0);
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let store = funded_store();
        transfer(&store, &LOGIC, &ALICE, &ALICE, 300).unwrap();
        assert_eq!(balance_of(&store, &ALICE).unwrap(), 1_000);
    }

    #[test]
    fn test_transfer_requires_admin_logic() {
        let store = funded_store();
        let rogue = Address::new([9u8; 32]);
        let result = transfer(&store, &rogue, &ALICE, &BOB, 1);
        assert!(matches!(
            result,
            Err(TokenError::Storage(StorageError::Unauthorized { .. }))
        ));
        assert_eq!(balance_of(&store, &ALICE).unwrap(), 1_000);
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let store = funded_store();
        approve(&store, &LOGIC, &ALICE, &CAROL, 500).unwrap();
        transfer_from(&store, &LOGIC, &CAROL, &ALICE, &BOB, 300).unwrap();

        assert_eq!(allowance(&store, &ALICE, &CAROL).unwrap(), 200);
        assert_eq!(balance_of(&store, &ALICE).unwrap(), 700);
        assert_eq!(balance_of(&store, &BOB).unwrap(), 300);
    }

    #[test]
    fn test_transfer_from_over_allowance() {
        let store = funded_store();
        approve(&store, &LOGIC, &ALICE, &CAROL, 100).unwrap();
        let result = transfer_from(&store, &LOGIC, &CAROL, &ALICE, &BOB, 101);
        assert!(matches!(
            result,
            Err(TokenError::InsufficientAllowance { have: 100, need: 101 })
        ));
        assert_eq!(allowance(&store, &ALICE, &CAROL).unwrap(), 100);
    }

    #[test]
    fn test_transfer_from_over_balance_keeps_allowance() {
        let store = funded_store();
        approve(&store, &LOGIC, &ALICE, &CAROL, 5_000).unwrap();
        let result = transfer_from(&store, &LOGIC, &CAROL, &ALICE, &BOB, 2_000);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        assert_eq!(allowance(&store, &ALICE, &CAROL).unwrap(), 5_000);
        assert_eq!(balance_of(&store, &ALICE).unwrap(), 1_000);
    }

    #[test]
    fn test_approve_replaces_previous_value() {
        let store = funded_store();
        approve(&store, &LOGIC, &ALICE, &CAROL, 100).unwrap();
        approve(&store, &LOGIC, &ALICE, &CAROL, 40).unwrap();
        assert_eq!(allowance(&store, &ALICE, &CAROL).unwrap(), 40);
        assert_eq!(allowance(&store, &CAROL, &ALICE).unwrap(), 0);
    }

    #[test]
    fn test_burn_reduces_supply() {
        let store = funded_store();
        burn(&store, &LOGIC, &ALICE, 400).unwrap();
        assert_eq!(balance_of(&store, &ALICE).unwrap(), 600);
        assert_eq!(total_supply(&store).unwrap(), 600);

        let result = burn(&store, &LOGIC, &ALICE, 601);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
    }
}
