//! Error types for StakeUp.
use thiserror::Error;

use crate::types::{Address, PoolState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")] Overflow,
    #[error("division by zero")] DivisionByZero,
    #[error("unsupported decimals: {0}")] UnsupportedDecimals(u8),
    #[error("invalid decimal string: {0}")] InvalidDecimal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DripError {
    #[error("invalid amount: {0}")] InvalidAmount(String),
    #[error("remaining supply {remaining} exceeds total supply {total}")] RemainingExceedsSupply { remaining: u128, total: u128 },
    #[error("clock {now} is before schedule start {start}")] ClockBeforeStart { now: u64, start: u64 },
    #[error("schedule exhausted: {elapsed}s elapsed since start")] ScheduleExhausted { elapsed: u64 },
    #[error("epoch {epoch} already seeded")] AlreadySeeded { epoch: u64 },
    #[error("no gauges configured")] NoGauges,
    #[error(transparent)] Math(#[from] MathError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid amount: {0}")] InvalidAmount(String),
    #[error("insufficient shares: have {have}, need {need}")] InsufficientShares { have: u128, need: u128 },
    #[error("insufficient liquidity: have {have}, need {need}")] InsufficientLiquidity { have: u128, need: u128 },
    #[error("stale or missing exchange rate for pool {0}")] StaleOrMissingRate(Address),
    #[error("unknown or inactive pool: {0}")] UnknownPool(Address),
    #[error("pool {pool} does not accept deposits in state {state:?}")] PoolClosed { pool: Address, state: PoolState },
    #[error("pool {pool} not settled: state {state:?}")] PoolNotSettled { pool: Address, state: PoolState },
    #[error(transparent)] Math(#[from] MathError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("invalid amount: {0}")] InvalidAmount(String),
    #[error("insufficient stake: have {have}, need {need}")] InsufficientStake { have: u128, need: u128 },
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Math(#[from] MathError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("load: {0}")] Load(String),
    #[error("{field} = {value} bps exceeds 10000")] InvalidBps { field: &'static str, value: u16 },
    #[error("unsupported token decimals: {0}")] InvalidDecimals(u8),
    #[error("fee sink must not be the zero address")] ZeroFeeSink,
    #[error("unknown external token: {0}")] UnknownToken(Address),
}

#[derive(Error, Debug)]
pub enum StakeupError {
    #[error(transparent)] Math(#[from] MathError),
    #[error(transparent)] Drip(#[from] DripError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Staking(#[from] StakingError),
    #[error(transparent)] Config(#[from] ConfigError),
}
