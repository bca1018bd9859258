//! # stakeup-drip: Reward drip schedule.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Yearly decay table**: a fixed reward supply unlocks 50%, 25%, 12.5%,
//!   6.25%, 3.125% and 3.125% over six 52-week years.
//! - **Catch-up drips**: everything unlocked so far, minus what was claimed,
//!   with linear pro-rata unlocking inside the running year.
//! - **Current-rate drips**: exactly one weekly epoch of the running year's
//!   allocation, sweeping the remainder on the final epoch.
//! - **Gauge seeding**: weekly current-rate drips into a set of liquidity gauges.

pub mod gauge;
pub mod schedule;

pub use gauge::{CurvePoolData, GaugeDistributor, GaugeSeed};
pub use schedule::{calculate_drip_amount, unlocked_at, DripSchedule, YEARLY_ALLOCATION};
