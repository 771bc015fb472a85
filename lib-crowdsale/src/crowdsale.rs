//! Crowdsale - Capped, Time-Gated Sale with Deferred Delivery
//!
//! # Purchase Check Order
//!
//! All checks run BEFORE any value moves:
//! 1. Sale window is open
//! 2. Value is non-zero
//! 3. Beneficiary's individual or group cap
//! 4. Aggregate sale cap
//! 5. Value buys at least one token unit
//!
//! Only then is the value forwarded to the wallet, and only after that
//! succeeds are the cap ledger, the raised total and the contribution
//! updated. A rejected purchase changes nothing.
//!
//! # Settlement
//!
//! Tokens are owed, not delivered, while the sale runs. After closing each
//! contributor claims once; the sale pulls the owed amount from
//! `token_source` using the allowance granted to the sale address. The claim
//! latch moves `Pending -> Claimed` exactly once and a repeat is an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use lib_tokens::Erc20;
use lib_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cap_ledger::{CapBucket, CapLedger, GroupId};
use crate::clock::{Clock, SystemClock};
use crate::config::SaleConfig;
use crate::errors::{ConfigError, SaleError, SaleResult};
use crate::events::SaleEvent;
use crate::funds::FundsSink;
use crate::sale_clock::{SaleClock, SalePhase};

/// One-shot withdrawal latch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    Pending,
    Claimed,
}

/// What one address has paid and is owed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub wei_contributed: Amount,
    /// Accumulated `floor(value / rate)` over accepted purchases
    pub tokens_owed: Amount,
    pub settlement: Settlement,
}

impl Contribution {
    /// Tokens still claimable. Zero once claimed.
    pub fn outstanding(&self) -> Amount {
        match self.settlement {
            Settlement::Pending => self.tokens_owed,
            Settlement::Claimed => 0,
        }
    }
}

/// Receipt of an accepted purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchase {
    pub beneficiary: Address,
    pub value: Amount,
    pub tokens: Amount,
}

pub struct Crowdsale<C: Clock = SystemClock> {
    owner: Address,
    address: Address,
    rate: Amount,
    wallet: Address,
    token_source: Address,
    token: Arc<dyn Erc20>,
    funds: Arc<dyn FundsSink>,
    clock: C,
    sale: SaleClock,
    caps: CapLedger,
    contributions: BTreeMap<Address, Contribution>,
    events: Vec<SaleEvent>,
}

impl<C: Clock> Crowdsale<C> {
    /// Create a sale at `address` owned by `owner`
    ///
    /// `token` must be the handle of the token named in `config.token`.
    pub fn new(
        owner: Address,
        address: Address,
        config: SaleConfig,
        token: Arc<dyn Erc20>,
        funds: Arc<dyn FundsSink>,
        clock: C,
    ) -> SaleResult<Self> {
        config.validate(clock.now())?;
        if token.address() != config.token {
            return Err(ConfigError::TokenMismatch {
                expected: config.token,
                actual: token.address(),
            }
            .into());
        }

        info!(
            "Crowdsale {}: rate {}, cap {}, window {}..={}",
            address, config.rate, config.cap, config.opening_time, config.closing_time
        );

        Ok(Self {
            owner,
            address,
            rate: config.rate,
            wallet: config.wallet,
            token_source: config.token_source,
            token,
            funds,
            clock,
            sale: SaleClock::new(config.opening_time, config.closing_time, config.cap),
            caps: CapLedger::new(),
            contributions: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    // ─── Cap Configuration (owner only) ─────────────────────────────────

    pub fn set_user_cap(&mut self, caller: &Address, address: Address, cap: Amount) -> SaleResult<()> {
        self.ensure_owner(caller, "set user cap")?;
        self.caps.set_user_cap(address, cap);
        info!("Crowdsale {}: cap {} for {}", self.address, cap, address);
        self.events.push(SaleEvent::UserCapSet { address, cap });
        Ok(())
    }

    pub fn set_group_cap(
        &mut self,
        caller: &Address,
        members: &[Address],
        cap: Amount,
    ) -> SaleResult<GroupId> {
        self.ensure_owner(caller, "set group cap")?;
        let group = self.caps.set_group_cap(members, cap);
        info!(
            "Crowdsale {}: {} cap {} shared by {} member(s)",
            self.address,
            group,
            cap,
            members.len()
        );
        self.events.push(SaleEvent::GroupCapSet {
            group,
            members: members.to_vec(),
            cap,
        });
        Ok(group)
    }

    // ─── Purchases ──────────────────────────────────────────────────────

    /// Pay `value` wei from `caller` and credit the owed tokens to `beneficiary`
    pub fn buy_tokens(
        &mut self,
        caller: &Address,
        beneficiary: &Address,
        value: Amount,
    ) -> SaleResult<Purchase> {
        let purchase = self.validate_purchase(beneficiary, value);
        let (bucket, tokens, contribution) = match purchase {
            Ok(validated) => validated,
            Err(e) => {
                debug!("Crowdsale {}: purchase for {} rejected: {}", self.address, beneficiary, e);
                return Err(e);
            }
        };

        self.funds.forward(caller, &self.wallet, value)?;

        // Nothing below can fail.
        self.caps.commit(bucket, value);
        self.sale.record(value);
        self.contributions.insert(*beneficiary, contribution);

        info!(
            "Crowdsale {}: {} paid {} for {}, owed {} tokens (raised {})",
            self.address,
            caller,
            value,
            beneficiary,
            tokens,
            self.sale.wei_raised()
        );
        self.events.push(SaleEvent::TokensPurchased {
            purchaser: *caller,
            beneficiary: *beneficiary,
            value,
            amount: tokens,
        });

        Ok(Purchase {
            beneficiary: *beneficiary,
            value,
            tokens,
        })
    }

    /// Plain value transfer to the sale: buys for the sender
    pub fn receive(&mut self, caller: &Address, value: Amount) -> SaleResult<Purchase> {
        self.buy_tokens(caller, caller, value)
    }

    fn validate_purchase(
        &self,
        beneficiary: &Address,
        value: Amount,
    ) -> SaleResult<(CapBucket, Amount, Contribution)> {
        self.sale.ensure_open(self.clock.now())?;
        if value == 0 {
            return Err(SaleError::ZeroPurchase { value, rate: self.rate });
        }

        let bucket = self.caps.check(beneficiary, value)?;
        self.sale.ensure_within_cap(value)?;

        let tokens = value / self.rate;
        if tokens == 0 {
            return Err(SaleError::ZeroPurchase { value, rate: self.rate });
        }

        let mut contribution = self
            .contributions
            .get(beneficiary)
            .cloned()
            .unwrap_or(Contribution {
                wei_contributed: 0,
                tokens_owed: 0,
                settlement: Settlement::Pending,
            });
        contribution.wei_contributed = contribution
            .wei_contributed
            .checked_add(value)
            .ok_or(SaleError::ArithmeticOverflow)?;
        contribution.tokens_owed = contribution
            .tokens_owed
            .checked_add(tokens)
            .ok_or(SaleError::ArithmeticOverflow)?;

        Ok((bucket, tokens, contribution))
    }

    // ─── Settlement ─────────────────────────────────────────────────────

    /// Deliver the caller's owed tokens. Only after close, only once.
    pub fn withdraw_tokens(&mut self, caller: &Address) -> SaleResult<Amount> {
        self.sale.ensure_closed(self.clock.now())?;

        let owed = match self.contributions.get(caller) {
            None => return Err(SaleError::NothingToWithdraw(*caller)),
            Some(c) if c.settlement == Settlement::Claimed => {
                warn!("Crowdsale {}: repeat withdrawal by {}", self.address, caller);
                return Err(SaleError::AlreadyWithdrawn(*caller));
            }
            Some(c) => c.tokens_owed,
        };

        let available = self.token.allowance(&self.token_source, &self.address)?;
        if available < owed {
            warn!(
                "Crowdsale {}: allowance {} from {} cannot cover {} owed to {}",
                self.address, available, self.token_source, owed, caller
            );
            return Err(SaleError::InsufficientAllowance { available, owed });
        }

        self.token
            .transfer_from(&self.address, &self.token_source, caller, owed)?;

        if let Some(contribution) = self.contributions.get_mut(caller) {
            contribution.settlement = Settlement::Claimed;
        }
        info!("Crowdsale {}: {} withdrew {} tokens", self.address, caller, owed);
        self.events.push(SaleEvent::TokensWithdrawn {
            beneficiary: *caller,
            amount: owed,
        });
        Ok(owed)
    }

    // ─── Queries ────────────────────────────────────────────────────────

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn rate(&self) -> Amount {
        self.rate
    }

    pub fn wallet(&self) -> Address {
        self.wallet
    }

    pub fn token_source(&self) -> Address {
        self.token_source
    }

    pub fn token(&self) -> Address {
        self.token.address()
    }

    pub fn cap(&self) -> Amount {
        self.sale.cap()
    }

    pub fn opening_time(&self) -> Timestamp {
        self.sale.opening_time()
    }

    pub fn closing_time(&self) -> Timestamp {
        self.sale.closing_time()
    }

    pub fn wei_raised(&self) -> Amount {
        self.sale.wei_raised()
    }

    pub fn is_open(&self) -> bool {
        self.sale.is_open(self.clock.now())
    }

    pub fn has_closed(&self) -> bool {
        self.sale.has_closed(self.clock.now())
    }

    pub fn phase(&self) -> SalePhase {
        self.sale.phase(self.clock.now())
    }

    pub fn cap_reached(&self) -> bool {
        self.sale.cap_reached()
    }

    /// Wei the sale can still accept before the aggregate cap
    pub fn remaining_cap(&self) -> Amount {
        self.sale.remaining_cap()
    }

    pub fn get_user_cap(&self, address: &Address) -> Amount {
        self.caps.get_user_cap(address)
    }

    pub fn get_user_contribution(&self, address: &Address) -> Amount {
        self.caps.get_user_contribution(address)
    }

    pub fn cap_ledger(&self) -> &CapLedger {
        &self.caps
    }

    pub fn contribution(&self, address: &Address) -> Option<&Contribution> {
        self.contributions.get(address)
    }

    /// Tokens `address` can still withdraw
    pub fn tokens_owed(&self, address: &Address) -> Amount {
        self.contributions
            .get(address)
            .map(Contribution::outstanding)
            .unwrap_or(0)
    }

    /// Tokens the sale can still pull from `token_source`
    pub fn remaining_tokens(&self) -> SaleResult<Amount> {
        let balance = self.token.balance_of(&self.token_source)?;
        let allowance = self.token.allowance(&self.token_source, &self.address)?;
        Ok(balance.min(allowance))
    }

    pub fn events(&self) -> &[SaleEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<SaleEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_owner(&self, caller: &Address, action: &'static str) -> SaleResult<()> {
        if *caller == self.owner {
            return Ok(());
        }
        warn!("Crowdsale {}: {} rejected for {}", self.address, action, caller);
        Err(SaleError::Unauthorized {
            caller: *caller,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::funds::NativeLedger;
    use lib_tokens::TokenResult;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    const OWNER: Address = Address::new([0x01; 32]);
    const SALE: Address = Address::new([0x0a; 32]);
    const TOKEN: Address = Address::new([0x0b; 32]);
    const WALLET: Address = Address::new([0x0c; 32]);
    const SOURCE: Address = Address::new([0x0d; 32]);
    const ALICE: Address = Address::new([0xa1; 32]);

    /// Plain in-memory token
    #[derive(Default)]
    struct MockToken {
        balances: Mutex<HashMap<Address, Amount>>,
        allowances: Mutex<HashMap<(Address, Address), Amount>>,
    }

    impl Erc20 for MockToken {
        fn address(&self) -> Address {
            TOKEN
        }
        fn total_supply(&self) -> TokenResult<Amount> {
            Ok(self.balances.lock().values().sum())
        }
        fn balance_of(&self, owner: &Address) -> TokenResult<Amount> {
            Ok(self.balances.lock().get(owner).copied().unwrap_or(0))
        }
        fn allowance(&self, owner: &Address, spender: &Address) -> TokenResult<Amount> {
            Ok(self.allowances.lock().get(&(*owner, *spender)).copied().unwrap_or(0))
        }
        fn transfer(&self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
            let mut balances = self.balances.lock();
            *balances.entry(*caller).or_insert(0) -= amount;
            *balances.entry(*to).or_insert(0) += amount;
            Ok(())
        }
        fn approve(&self, caller: &Address, spender: &Address, amount: Amount) -> TokenResult<()> {
            self.allowances.lock().insert((*caller, *spender), amount);
            Ok(())
        }
        fn transfer_from(
            &self,
            caller: &Address,
            from: &Address,
            to: &Address,
            amount: Amount,
        ) -> TokenResult<()> {
            *self.allowances.lock().entry((*from, *caller)).or_insert(0) -= amount;
            self.transfer(from, to, amount)
        }
    }

    fn config() -> SaleConfig {
        SaleConfig {
            rate: 2,
            wallet: WALLET,
            token: TOKEN,
            token_source: SOURCE,
            cap: 100,
            opening_time: 1_000,
            closing_time: 2_000,
        }
    }

    fn sale() -> (Crowdsale<ManualClock>, ManualClock, Arc<NativeLedger>) {
        let clock = ManualClock::new(500);
        let token = Arc::new(MockToken::default());
        token.balances.lock().insert(SOURCE, 1_000);
        token.approve(&SOURCE, &SALE, 1_000).unwrap();

        let funds = Arc::new(NativeLedger::new());
        funds.credit(&ALICE, 1_000).unwrap();

        let sale = Crowdsale::new(OWNER, SALE, config(), token, funds.clone(), clock.clone()).unwrap();
        (sale, clock, funds)
    }

    #[test]
    fn test_new_rejects_token_mismatch() {
        let token = Arc::new(MockToken::default());
        let config = SaleConfig {
            token: Address::new([0xee; 32]),
            ..config()
        };
        let result = Crowdsale::new(
            OWNER,
            SALE,
            config,
            token,
            Arc::new(NativeLedger::new()),
            ManualClock::new(0),
        );
        assert!(matches!(
            result,
            Err(SaleError::Config(ConfigError::TokenMismatch { .. }))
        ));
    }

    #[test]
    fn test_new_rejects_opening_in_past() {
        let result = Crowdsale::new(
            OWNER,
            SALE,
            config(),
            Arc::new(MockToken::default()),
            Arc::new(NativeLedger::new()),
            ManualClock::new(1_500),
        );
        assert!(matches!(
            result,
            Err(SaleError::Config(ConfigError::OpeningInPast { .. }))
        ));
    }

    #[test]
    fn test_rounding_floors_to_whole_tokens() {
        let (mut sale, clock, funds) = sale();
        sale.set_user_cap(&OWNER, ALICE, 50).unwrap();
        clock.set(1_000);

        let purchase = sale.buy_tokens(&ALICE, &ALICE, 5).unwrap();
        assert_eq!(purchase.tokens, 2);
        assert_eq!(sale.tokens_owed(&ALICE), 2);
        assert_eq!(sale.wei_raised(), 5);
        assert_eq!(funds.balance_of(&WALLET), 5);
    }

    #[test]
    fn test_purchase_below_rate_rejected_without_effects() {
        let (mut sale, clock, funds) = sale();
        sale.set_user_cap(&OWNER, ALICE, 50).unwrap();
        clock.set(1_000);

        let result = sale.buy_tokens(&ALICE, &ALICE, 1);
        assert!(matches!(result, Err(SaleError::ZeroPurchase { value: 1, rate: 2 })));
        assert_eq!(sale.get_user_contribution(&ALICE), 0);
        assert_eq!(sale.wei_raised(), 0);
        assert_eq!(funds.balance_of(&ALICE), 1_000);
        assert!(sale.contribution(&ALICE).is_none());
    }

    #[test]
    fn test_zero_value_rejected() {
        let (mut sale, clock, _) = sale();
        sale.set_user_cap(&OWNER, ALICE, 50).unwrap();
        clock.set(1_000);
        assert!(matches!(
            sale.buy_tokens(&ALICE, &ALICE, 0),
            Err(SaleError::ZeroPurchase { value: 0, .. })
        ));
    }

    #[test]
    fn test_failed_forward_leaves_state() {
        let (mut sale, clock, _) = sale();
        let broke = Address::new([0x99; 32]);
        sale.set_user_cap(&OWNER, broke, 50).unwrap();
        clock.set(1_000);

        assert!(matches!(
            sale.buy_tokens(&broke, &broke, 10),
            Err(SaleError::Funds(_))
        ));
        assert_eq!(sale.get_user_contribution(&broke), 0);
        assert_eq!(sale.wei_raised(), 0);
        assert_eq!(sale.tokens_owed(&broke), 0);
    }

    #[test]
    fn test_cap_setters_owner_only() {
        let (mut sale, _, _) = sale();
        assert!(matches!(
            sale.set_user_cap(&ALICE, ALICE, 10),
            Err(SaleError::Unauthorized { action: "set user cap", .. })
        ));
        assert!(matches!(
            sale.set_group_cap(&ALICE, &[ALICE], 10),
            Err(SaleError::Unauthorized { action: "set group cap", .. })
        ));
        assert_eq!(sale.get_user_cap(&ALICE), 0);
        assert!(sale.events().is_empty());
    }

    #[test]
    fn test_receive_buys_for_sender() {
        let (mut sale, clock, _) = sale();
        sale.set_user_cap(&OWNER, ALICE, 50).unwrap();
        clock.set(1_500);

        let purchase = sale.receive(&ALICE, 10).unwrap();
        assert_eq!(purchase.beneficiary, ALICE);
        assert_eq!(sale.tokens_owed(&ALICE), 5);
    }

    #[test]
    fn test_withdraw_latches() {
        let (mut sale, clock, _) = sale();
        sale.set_user_cap(&OWNER, ALICE, 50).unwrap();
        clock.set(1_000);
        sale.buy_tokens(&ALICE, &ALICE, 10).unwrap();

        clock.set(2_001);
        assert_eq!(sale.withdraw_tokens(&ALICE).unwrap(), 5);
        assert_eq!(sale.tokens_owed(&ALICE), 0);
        assert_eq!(sale.contribution(&ALICE).unwrap().settlement, Settlement::Claimed);
        assert!(matches!(
            sale.withdraw_tokens(&ALICE),
            Err(SaleError::AlreadyWithdrawn(addr)) if addr == ALICE
        ));
    }

    #[test]
    fn test_events_drained_in_order() {
        let (mut sale, clock, _) = sale();
        sale.set_user_cap(&OWNER, ALICE, 50).unwrap();
        clock.set(1_000);
        sale.buy_tokens(&ALICE, &ALICE, 4).unwrap();

        let events = sale.take_events();
        assert_eq!(
            events,
            vec![
                SaleEvent::UserCapSet { address: ALICE, cap: 50 },
                SaleEvent::TokensPurchased {
                    purchaser: ALICE,
                    beneficiary: ALICE,
                    value: 4,
                    amount: 2,
                },
            ]
        );
        assert!(sale.take_events().is_empty());
    }
}
