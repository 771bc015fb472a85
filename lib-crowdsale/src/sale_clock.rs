//! Sale window and aggregate cap

use lib_types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::errors::{CapScope, SaleError, SaleResult};

/// Phase derived from the current time. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalePhase {
    /// Before `opening_time`
    Pending,
    /// `opening_time <= now <= closing_time`
    Open,
    /// After `closing_time`
    Closed,
}

/// Opening/closing window plus the running total against the sale cap
///
/// # Invariants
/// - `opening_time < closing_time` (enforced by config validation)
/// - `wei_raised <= cap`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleClock {
    opening_time: Timestamp,
    closing_time: Timestamp,
    cap: Amount,
    wei_raised: Amount,
}

impl SaleClock {
    pub fn new(opening_time: Timestamp, closing_time: Timestamp, cap: Amount) -> Self {
        Self {
            opening_time,
            closing_time,
            cap,
            wei_raised: 0,
        }
    }

    pub fn opening_time(&self) -> Timestamp {
        self.opening_time
    }

    pub fn closing_time(&self) -> Timestamp {
        self.closing_time
    }

    pub fn cap(&self) -> Amount {
        self.cap
    }

    pub fn wei_raised(&self) -> Amount {
        self.wei_raised
    }

    /// Both ends of the window are inclusive
    pub fn is_open(&self, now: Timestamp) -> bool {
        self.opening_time <= now && now <= self.closing_time
    }

    pub fn has_closed(&self, now: Timestamp) -> bool {
        now > self.closing_time
    }

    pub fn phase(&self, now: Timestamp) -> SalePhase {
        if now < self.opening_time {
            SalePhase::Pending
        } else if now <= self.closing_time {
            SalePhase::Open
        } else {
            SalePhase::Closed
        }
    }

    pub fn cap_reached(&self) -> bool {
        self.wei_raised >= self.cap
    }

    pub fn remaining_cap(&self) -> Amount {
        self.cap.saturating_sub(self.wei_raised)
    }

    pub fn ensure_open(&self, now: Timestamp) -> SaleResult<()> {
        if self.is_open(now) {
            return Ok(());
        }
        Err(SaleError::SaleNotOpen {
            now,
            opening: self.opening_time,
            closing: self.closing_time,
        })
    }

    pub fn ensure_closed(&self, now: Timestamp) -> SaleResult<()> {
        if self.has_closed(now) {
            return Ok(());
        }
        Err(SaleError::SaleNotClosed {
            now,
            closing: self.closing_time,
        })
    }

    /// Check that `value` fits under the sale cap without recording it
    pub fn ensure_within_cap(&self, value: Amount) -> SaleResult<()> {
        if value > self.remaining_cap() {
            return Err(SaleError::CapExceeded {
                scope: CapScope::Sale,
                cap: self.cap,
                contributed: self.wei_raised,
                attempted: value,
            });
        }
        Ok(())
    }

    /// Add `value` to the running total. Call only after `ensure_within_cap`.
    pub fn record(&mut self, value: Amount) {
        self.wei_raised = self.wei_raised.saturating_add(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> SaleClock {
        SaleClock::new(1_000, 2_000, 100)
    }

    #[test]
    fn test_window_boundaries_inclusive() {
        let sale = clock();
        assert!(!sale.is_open(999));
        assert!(sale.is_open(1_000));
        assert!(sale.is_open(2_000));
        assert!(!sale.is_open(2_001));

        assert!(!sale.has_closed(2_000));
        assert!(sale.has_closed(2_001));
    }

    #[test]
    fn test_phase_progression() {
        let sale = clock();
        assert_eq!(sale.phase(0), SalePhase::Pending);
        assert_eq!(sale.phase(1_500), SalePhase::Open);
        assert_eq!(sale.phase(5_000), SalePhase::Closed);
    }

    #[test]
    fn test_ensure_open_errors() {
        let sale = clock();
        assert!(matches!(
            sale.ensure_open(999),
            Err(SaleError::SaleNotOpen { now: 999, opening: 1_000, closing: 2_000 })
        ));
        assert!(matches!(
            sale.ensure_closed(2_000),
            Err(SaleError::SaleNotClosed { now: 2_000, closing: 2_000 })
        ));
    }

    #[test]
    fn test_aggregate_cap() {
        let mut sale = clock();
        sale.ensure_within_cap(60).unwrap();
        sale.record(60);
        assert_eq!(sale.remaining_cap(), 40);
        assert!(!sale.cap_reached());

        assert!(matches!(
            sale.ensure_within_cap(41),
            Err(SaleError::CapExceeded { scope: CapScope::Sale, .. })
        ));
        assert_eq!(sale.wei_raised(), 60);

        sale.ensure_within_cap(40).unwrap();
        sale.record(40);
        assert!(sale.cap_reached());
    }

    #[test]
    fn test_cap_check_near_max_is_rejected_not_wrapped() {
        let mut sale = SaleClock::new(0, 1, Amount::MAX);
        sale.record(1);
        assert_eq!(sale.remaining_cap(), Amount::MAX - 1);
        assert!(matches!(
            sale.ensure_within_cap(Amount::MAX),
            Err(SaleError::CapExceeded { scope: CapScope::Sale, contributed: 1, .. })
        ));
        sale.ensure_within_cap(Amount::MAX - 1).unwrap();
    }
}
