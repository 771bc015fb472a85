//! Sale Events
//!
//! Every accepted state change appends one event. The host drains them with
//! [`Crowdsale::take_events`](crate::Crowdsale::take_events).

use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::cap_ledger::GroupId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SaleEvent {
    /// Individual cap configured
    UserCapSet { address: Address, cap: Amount },

    /// Group pool created
    GroupCapSet {
        group: GroupId,
        members: Vec<Address>,
        cap: Amount,
    },

    /// Contribution accepted; tokens are owed, not delivered
    TokensPurchased {
        purchaser: Address,
        beneficiary: Address,
        /// Wei paid
        value: Amount,
        /// Tokens owed for this purchase
        amount: Amount,
    },

    /// Owed tokens delivered after close
    TokensWithdrawn { beneficiary: Address, amount: Amount },
}
