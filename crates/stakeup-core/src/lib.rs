//! # stakeup-core
//! Foundation types, fixed-point math and trait seams shared by the
//! StakeUp drip schedule and share ledger.

pub mod constants;
pub mod error;
pub mod math;
pub mod registry;
pub mod traits;
pub mod types;
