//! Native currency movement
//!
//! The sale never holds contributed value: each accepted purchase is
//! forwarded to the sale wallet through a [`FundsSink`] supplied by the host
//! runtime.

use std::collections::BTreeMap;

use lib_types::{Address, Amount};
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::{SaleError, SaleResult};

/// Moves native value between accounts
pub trait FundsSink: Send + Sync {
    /// Move `amount` from `from` to `to`. Must not partially apply.
    fn forward(&self, from: &Address, to: &Address, amount: Amount) -> SaleResult<()>;
}

/// In-process native balance ledger
#[derive(Debug, Default)]
pub struct NativeLedger {
    balances: Mutex<BTreeMap<Address, Amount>>,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to `account` out of thin air (genesis funding)
    pub fn credit(&self, account: &Address, amount: Amount) -> SaleResult<()> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(*account).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(SaleError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }
}

impl FundsSink for NativeLedger {
    fn forward(&self, from: &Address, to: &Address, amount: Amount) -> SaleResult<()> {
        let mut balances = self.balances.lock();

        let from_balance = balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(SaleError::Funds(format!(
                "{} holds {}, needs {}",
                from, from_balance, amount
            )));
        }
        if from == to {
            return Ok(());
        }
        let to_balance = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(SaleError::ArithmeticOverflow)?;

        balances.insert(*from, from_balance - amount);
        balances.insert(*to, to_balance);
        debug!("Native ledger: {} -> {} amount {}", from, to, amount);
        Ok(())
    }
}
