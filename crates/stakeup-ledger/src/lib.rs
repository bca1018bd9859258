//! # stakeup-ledger: Share/value bookkeeping for the stUSD token.
//!
//! Deposits of underlying or pool receipt tokens mint shares at the current
//! exchange rate (`total_usd / total_shares`). Mint, redeem and performance
//! fees are charged in basis points and credited to a fee sink as shares.
//! [`ShareLedger::poke`] re-syncs total value from the rate feed and commits
//! idle underlying to the newest pool near the end of its commit phase.
//!
//! [`SharedLedger`] serializes access to one ledger across threads, and
//! [`StakingPool`] passes the fee sink's shares on to stakers.

pub mod config;
pub mod ledger;
pub mod shared;
pub mod staking;

pub use crate::config::LedgerConfig;
pub use crate::ledger::{
    DepositReceipt, LedgerSnapshot, PokeReport, Position, RedeemReceipt, SettlementReport,
    ShareLedger,
};
pub use crate::shared::SharedLedger;
pub use crate::staking::StakingPool;
