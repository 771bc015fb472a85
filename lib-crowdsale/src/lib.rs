//! Capped Crowdsale
//!
//! A time-gated token sale with per-address and per-group caps. Contributions
//! are forwarded to the sale wallet immediately; tokens are only delivered
//! after the sale closes, once per contributor, from a pre-approved source.
//!
//! ```text
//! contributor ──buy_tokens──▶ Crowdsale
//!                               ├─ SaleClock   (window + aggregate cap)
//!                               ├─ CapLedger   (individual / group caps)
//!                               └─ FundsSink   (value → wallet)
//!
//! after close ──withdraw_tokens──▶ Crowdsale ──transfer_from──▶ Erc20 (TokenFront)
//! ```

pub mod cap_ledger;
pub mod clock;
pub mod config;
pub mod crowdsale;
pub mod errors;
pub mod events;
pub mod funds;
pub mod sale_clock;

pub use cap_ledger::{CapBucket, CapEntry, CapLedger, GroupId, GroupPool};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{parse_amount, SaleConfig};
pub use crowdsale::{Contribution, Crowdsale, Purchase, Settlement};
pub use errors::{CapScope, ConfigError, SaleError, SaleResult};
pub use events::SaleEvent;
pub use funds::{FundsSink, NativeLedger};
pub use sale_clock::{SaleClock, SalePhase};
