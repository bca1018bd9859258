//! Scenario test suite for StakeUp.
//!
//! Integration tests drive the drip schedule, gauge seeding, share ledger
//! and fee-sink staking together through a per-test [`helpers::TestEnv`].

pub mod helpers;
