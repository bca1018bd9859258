//! Weekly seeding of liquidity gauges from per-pool reward budgets.
//!
//! Each configured pool owns its own budget and drips one epoch at the
//! current year's rate per seeding. Seeding is all-or-nothing across pools.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use stakeup_core::constants::{EPOCH_DURATION, SCHEDULE_DURATION};
use stakeup_core::error::DripError;
use stakeup_core::types::Address;

use crate::schedule::calculate_drip_amount;

/// Reward budget attached to one liquidity pool and its gauge.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CurvePoolData {
    pub curve_pool: Address,
    pub curve_gauge: Address,
    /// Total reward allocated to this pool over the whole schedule.
    pub reward_amount: u128,
    /// Reward not yet seeded into the gauge.
    pub rewards_remaining: u128,
}

impl CurvePoolData {
    pub fn new(curve_pool: Address, curve_gauge: Address, reward_amount: u128) -> Self {
        Self {
            curve_pool,
            curve_gauge,
            reward_amount,
            rewards_remaining: reward_amount,
        }
    }
}

/// One gauge deposit made by [`GaugeDistributor::seed_gauges`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GaugeSeed {
    pub epoch: u64,
    pub curve_pool: Address,
    pub curve_gauge: Address,
    pub amount: u128,
}

/// Seeds every configured gauge at most once per weekly epoch.
#[derive(Debug, Clone)]
pub struct GaugeDistributor {
    start_time: u64,
    pools: Vec<CurvePoolData>,
    last_seeded_epoch: Option<u64>,
    gauge_balances: HashMap<Address, u128>,
}

impl GaugeDistributor {
    /// Create a distributor whose schedule starts at `start_time`.
    ///
    /// # Errors
    ///
    /// - [`DripError::NoGauges`] if `pools` is empty
    /// - [`DripError::InvalidAmount`] if any pool has a zero reward amount
    pub fn new(start_time: u64, pools: Vec<CurvePoolData>) -> Result<Self, DripError> {
        if pools.is_empty() {
            return Err(DripError::NoGauges);
        }
        if let Some(pool) = pools.iter().find(|p| p.reward_amount == 0) {
            return Err(DripError::InvalidAmount(format!(
                "zero reward for pool {}",
                pool.curve_pool
            )));
        }
        Ok(Self {
            start_time,
            pools,
            last_seeded_epoch: None,
            gauge_balances: HashMap::new(),
        })
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn pools(&self) -> &[CurvePoolData] {
        &self.pools
    }

    pub fn last_seeded_epoch(&self) -> Option<u64> {
        self.last_seeded_epoch
    }

    /// Total seeded into `gauge` so far.
    pub fn gauge_balance(&self, gauge: &Address) -> u128 {
        self.gauge_balances.get(gauge).copied().unwrap_or(0)
    }

    /// Earliest time at which the next seeding is accepted.
    pub fn next_seed_time(&self) -> u64 {
        match self.last_seeded_epoch {
            Some(epoch) => self.start_time + (epoch + 1) * EPOCH_DURATION,
            None => self.start_time,
        }
    }

    /// Drip one epoch of rewards into every gauge.
    ///
    /// Once the six-year schedule is over, the first call releases whatever
    /// budget a missed final epoch left behind.
    ///
    /// # Errors
    ///
    /// - [`DripError::ClockBeforeStart`] if `now` precedes the start time
    /// - [`DripError::AlreadySeeded`] if the current epoch was already seeded
    /// - [`DripError::ScheduleExhausted`] once the schedule is over and every
    ///   budget is empty
    ///
    /// No pool budget changes when any error is returned.
    pub fn seed_gauges(&mut self, now: u64) -> Result<Vec<GaugeSeed>, DripError> {
        if now < self.start_time {
            return Err(DripError::ClockBeforeStart {
                now,
                start: self.start_time,
            });
        }
        let elapsed = now - self.start_time;
        let epoch = elapsed / EPOCH_DURATION;
        if self.last_seeded_epoch.is_some_and(|last| epoch <= last) {
            return Err(DripError::AlreadySeeded { epoch });
        }
        let finished = elapsed >= SCHEDULE_DURATION;
        if finished && self.pools.iter().all(|p| p.rewards_remaining == 0) {
            return Err(DripError::ScheduleExhausted { elapsed });
        }

        let seeds = self
            .pools
            .iter()
            .map(|pool| {
                let amount = if finished {
                    pool.rewards_remaining
                } else {
                    calculate_drip_amount(
                        pool.reward_amount,
                        self.start_time,
                        pool.rewards_remaining,
                        true,
                        now,
                    )?
                };
                Ok(GaugeSeed {
                    epoch,
                    curve_pool: pool.curve_pool,
                    curve_gauge: pool.curve_gauge,
                    amount,
                })
            })
            .collect::<Result<Vec<_>, DripError>>()?;

        for (pool, seed) in self.pools.iter_mut().zip(&seeds) {
            pool.rewards_remaining -= seed.amount;
            *self.gauge_balances.entry(seed.curve_gauge).or_insert(0) += seed.amount;
            debug!(
                epoch,
                gauge = %seed.curve_gauge,
                amount = seed.amount,
                remaining = pool.rewards_remaining,
                "gauge seeded"
            );
        }
        self.last_seeded_epoch = Some(epoch);

        let total: u128 = seeds.iter().map(|s| s.amount).sum();
        info!(epoch, gauges = seeds.len(), total, "seeded gauges");
        Ok(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeup_core::constants::{ONE_DAY, ONE_WEEK, SCHEDULE_DURATION, WAD};

    const START: u64 = 1_700_000_000;

    fn pool(seed: u8, reward: u128) -> CurvePoolData {
        CurvePoolData::new(Address::from_seed(seed), Address::from_seed(seed + 100), reward)
    }

    fn distributor() -> GaugeDistributor {
        GaugeDistributor::new(START, vec![pool(1, 1_000_000 * WAD), pool(2, 333 * WAD + 1)]).unwrap()
    }

    #[test]
    fn requires_gauges() {
        assert_eq!(GaugeDistributor::new(START, Vec::new()).unwrap_err(), DripError::NoGauges);
        assert!(GaugeDistributor::new(START, vec![pool(1, 0)]).is_err());
    }

    #[test]
    fn first_seed_is_half_year_rate() {
        let mut d = distributor();
        let seeds = d.seed_gauges(START).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].amount, 1_000_000 * WAD / 2 / 52);
        assert_eq!(d.gauge_balance(&Address::from_seed(101)), seeds[0].amount);
        assert_eq!(d.next_seed_time(), START + ONE_WEEK);
    }

    #[test]
    fn second_seed_same_week_rejected() {
        let mut d = distributor();
        d.seed_gauges(START + ONE_DAY).unwrap();
        let before = d.pools().to_vec();
        assert_eq!(
            d.seed_gauges(START + 6 * ONE_DAY),
            Err(DripError::AlreadySeeded { epoch: 0 })
        );
        assert_eq!(d.pools(), &before[..]);
        assert!(d.seed_gauges(START + ONE_WEEK).is_ok());
    }

    #[test]
    fn before_start_rejected() {
        let mut d = distributor();
        assert!(matches!(d.seed_gauges(START - 1), Err(DripError::ClockBeforeStart { .. })));
        assert_eq!(d.last_seeded_epoch(), None);
    }

    #[test]
    fn full_schedule_empties_every_budget() {
        let mut d = distributor();
        for week in 0..312 {
            d.seed_gauges(START + week * ONE_WEEK).unwrap();
        }
        for p in d.pools() {
            assert_eq!(p.rewards_remaining, 0);
            assert_eq!(d.gauge_balance(&p.curve_gauge), p.reward_amount);
        }
        assert!(matches!(
            d.seed_gauges(START + SCHEDULE_DURATION),
            Err(DripError::ScheduleExhausted { .. })
        ));
    }

    #[test]
    fn missed_final_week_swept_after_schedule() {
        let mut d = distributor();
        for week in 0..311 {
            d.seed_gauges(START + week * ONE_WEEK).unwrap();
        }
        let left: Vec<u128> = d.pools().iter().map(|p| p.rewards_remaining).collect();
        assert!(left.iter().all(|&r| r > 0));

        let seeds = d.seed_gauges(START + 312 * ONE_WEEK).unwrap();
        assert_eq!(seeds.iter().map(|s| s.amount).collect::<Vec<_>>(), left);
        for p in d.pools() {
            assert_eq!(p.rewards_remaining, 0);
            assert_eq!(d.gauge_balance(&p.curve_gauge), p.reward_amount);
        }
        assert!(matches!(
            d.seed_gauges(START + 313 * ONE_WEEK),
            Err(DripError::ScheduleExhausted { .. })
        ));
    }

    #[test]
    fn long_outage_still_releases_everything() {
        let mut d = distributor();
        d.seed_gauges(START).unwrap();
        d.seed_gauges(START + 2 * SCHEDULE_DURATION).unwrap();
        for p in d.pools() {
            assert_eq!(d.gauge_balance(&p.curve_gauge), p.reward_amount);
        }
    }

    #[test]
    fn skipped_weeks_are_not_caught_up() {
        let mut d = distributor();
        d.seed_gauges(START).unwrap();
        let seeds = d.seed_gauges(START + 10 * ONE_WEEK).unwrap();
        assert_eq!(seeds[0].epoch, 10);
        assert_eq!(seeds[0].amount, 1_000_000 * WAD / 2 / 52);
    }
}
