//! Time-decayed drip amounts over the six-year allocation table.
//!
//! The table is stored as numerators over [`ALLOCATION_DENOMINATOR`] so every
//! yearly fraction is exact in integers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use stakeup_core::constants::{EPOCHS_PER_YEAR, EPOCH_DURATION, ONE_YEAR, SCHEDULE_DURATION, SCHEDULE_YEARS};
use stakeup_core::error::DripError;
use stakeup_core::math::mul_div;

/// Per-year share of the total supply, in 32nds: 1/2, 1/4, 1/8, 1/16, 1/32, 1/32.
pub const YEARLY_ALLOCATION: [u128; SCHEDULE_YEARS as usize] = [16, 8, 4, 2, 1, 1];

/// Denominator of [`YEARLY_ALLOCATION`].
pub const ALLOCATION_DENOMINATOR: u128 = 32;

/// Sum of the allocation for the first `years` full years.
fn cumulative_allocation(years: usize) -> u128 {
    YEARLY_ALLOCATION.iter().take(years).sum()
}

fn validate(total_supply: u128, remaining_supply: u128, start_time: u64, now: u64) -> Result<u64, DripError> {
    if total_supply == 0 {
        return Err(DripError::InvalidAmount("total supply must be positive".into()));
    }
    if remaining_supply > total_supply {
        return Err(DripError::RemainingExceedsSupply {
            remaining: remaining_supply,
            total: total_supply,
        });
    }
    if now < start_time {
        return Err(DripError::ClockBeforeStart { now, start: start_time });
    }
    Ok(now - start_time)
}

/// Cumulative amount unlocked `elapsed` seconds after the schedule start.
///
/// Completed years contribute their full allocation; the running year
/// contributes linearly by the seconds elapsed within it.
///
/// # Errors
///
/// [`DripError::ScheduleExhausted`] once `elapsed` passes six years.
pub fn unlocked_at(total_supply: u128, elapsed: u64) -> Result<u128, DripError> {
    if elapsed > SCHEDULE_DURATION {
        return Err(DripError::ScheduleExhausted { elapsed });
    }
    let year = (elapsed / ONE_YEAR) as usize;
    if year >= YEARLY_ALLOCATION.len() {
        return Ok(total_supply);
    }
    let within = u128::from(elapsed % ONE_YEAR);
    let year_len = u128::from(ONE_YEAR);
    let weight = cumulative_allocation(year) * year_len + YEARLY_ALLOCATION[year] * within;
    Ok(mul_div(total_supply, weight, ALLOCATION_DENOMINATOR * year_len)?)
}

/// Amount to release now from a schedule that started at `start_time`.
///
/// With `force_current_rate == false` the result catches up on everything
/// unlocked but not yet claimed (`total_supply - remaining_supply` counts as
/// claimed). With `force_current_rate == true` it is one weekly epoch of the
/// running year's allocation, and the final epoch returns all of
/// `remaining_supply`. The result never exceeds `remaining_supply`.
///
/// # Errors
///
/// - [`DripError::InvalidAmount`] if `total_supply == 0`
/// - [`DripError::RemainingExceedsSupply`] if `remaining_supply > total_supply`
/// - [`DripError::ClockBeforeStart`] if `now < start_time`
/// - [`DripError::ScheduleExhausted`] past the six-year table
///
/// # Examples
///
/// ```
/// use stakeup_core::constants::ONE_YEAR;
/// use stakeup_drip::calculate_drip_amount;
///
/// let total = 32_000u128;
/// // One full year in, nothing claimed yet: the first-year half unlocks.
/// assert_eq!(calculate_drip_amount(total, 0, total, false, ONE_YEAR).unwrap(), 16_000);
/// ```
pub fn calculate_drip_amount(
    total_supply: u128,
    start_time: u64,
    remaining_supply: u128,
    force_current_rate: bool,
    now: u64,
) -> Result<u128, DripError> {
    let elapsed = validate(total_supply, remaining_supply, start_time, now)?;

    if force_current_rate {
        let year = elapsed / ONE_YEAR;
        if year >= SCHEDULE_YEARS {
            return Err(DripError::ScheduleExhausted { elapsed });
        }
        if elapsed + EPOCH_DURATION >= SCHEDULE_DURATION {
            return Ok(remaining_supply);
        }
        let epoch_amount = mul_div(
            total_supply,
            YEARLY_ALLOCATION[year as usize],
            ALLOCATION_DENOMINATOR * u128::from(EPOCHS_PER_YEAR),
        )?;
        return Ok(epoch_amount.min(remaining_supply));
    }

    let unlocked = unlocked_at(total_supply, elapsed)?;
    let claimed = total_supply - remaining_supply;
    Ok(unlocked.saturating_sub(claimed).min(remaining_supply))
}

/// A reward supply dripping out over the yearly table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DripSchedule {
    total_supply: u128,
    start_time: u64,
    remaining_supply: u128,
}

impl DripSchedule {
    /// Create a schedule with its whole supply still undistributed.
    ///
    /// # Errors
    ///
    /// [`DripError::InvalidAmount`] if `total_supply == 0`.
    pub fn new(total_supply: u128, start_time: u64) -> Result<Self, DripError> {
        if total_supply == 0 {
            return Err(DripError::InvalidAmount("total supply must be positive".into()));
        }
        Ok(Self {
            total_supply,
            start_time,
            remaining_supply: total_supply,
        })
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn remaining_supply(&self) -> u128 {
        self.remaining_supply
    }

    /// Total released so far.
    pub fn distributed(&self) -> u128 {
        self.total_supply - self.remaining_supply
    }

    /// Amount [`drip`](Self::drip) would release at `now`, without releasing it.
    pub fn preview(&self, now: u64, force_current_rate: bool) -> Result<u128, DripError> {
        calculate_drip_amount(
            self.total_supply,
            self.start_time,
            self.remaining_supply,
            force_current_rate,
            now,
        )
    }

    /// Release the amount due at `now` and deduct it from the remaining supply.
    pub fn drip(&mut self, now: u64, force_current_rate: bool) -> Result<u128, DripError> {
        let amount = self.preview(now, force_current_rate)?;
        self.remaining_supply -= amount;
        debug!(
            now,
            amount,
            remaining = self.remaining_supply,
            force_current_rate,
            "drip released"
        );
        Ok(amount)
    }
}
