//! Fee-sink staking: passes the fee sink's stUSD shares on to SUP stakers.
//!
//! Rewards accrue through an accumulated-reward-per-share index (scaled by
//! `WAD`). A staker's claimable amount is
//! `stake * index / WAD - reward_debt + pending`. Rewards distributed while
//! nobody is staked are held back and added to the next distribution.

use std::collections::HashMap;

use tracing::debug;

use stakeup_core::constants::WAD;
use stakeup_core::error::{MathError, StakingError};
use stakeup_core::math::mul_div;
use stakeup_core::types::Address;

use crate::ledger::ShareLedger;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct StakerInfo {
    amount: u128,
    reward_debt: u128,
    pending: u128,
}

/// Pro-rata distributor of fee shares to stakers.
#[derive(Clone, Debug, Default)]
pub struct StakingPool {
    total_staked: u128,
    acc_reward_per_share: u128,
    stakers: HashMap<Address, StakerInfo>,
    undistributed: u128,
    last_synced_shares: u128,
}

impl StakingPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_staked(&self) -> u128 {
        self.total_staked
    }

    pub fn staked(&self, account: &Address) -> u128 {
        self.stakers.get(account).map_or(0, |s| s.amount)
    }

    /// Rewards held back because no one was staked when they arrived.
    pub fn undistributed(&self) -> u128 {
        self.undistributed
    }

    fn accrued(&self, info: &StakerInfo) -> Result<u128, MathError> {
        mul_div(info.amount, self.acc_reward_per_share, WAD)
    }

    /// Move everything earned so far into `pending` and reset the debt.
    fn settle(&self, info: &mut StakerInfo) -> Result<(), MathError> {
        let accrued = self.accrued(info)?;
        info.pending = info
            .pending
            .checked_add(accrued.saturating_sub(info.reward_debt))
            .ok_or(MathError::Overflow)?;
        Ok(())
    }

    fn rebase_debt(&self, info: &mut StakerInfo) -> Result<(), MathError> {
        info.reward_debt = self.accrued(info)?;
        Ok(())
    }

    /// Rewards `account` could harvest now.
    pub fn claimable(&self, account: &Address) -> Result<u128, StakingError> {
        let Some(info) = self.stakers.get(account) else {
            return Ok(0);
        };
        let mut info = *info;
        self.settle(&mut info)?;
        Ok(info.pending)
    }

    pub fn stake(&mut self, account: Address, amount: u128) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount("zero stake".into()));
        }
        let mut info = self.stakers.get(&account).copied().unwrap_or_default();
        self.settle(&mut info)?;
        info.amount = info.amount.checked_add(amount).ok_or(MathError::Overflow)?;
        self.rebase_debt(&mut info)?;
        let total = self.total_staked.checked_add(amount).ok_or(MathError::Overflow)?;

        self.total_staked = total;
        self.stakers.insert(account, info);
        debug!(account = %account, amount, total_staked = total, "staked");
        Ok(())
    }

    pub fn unstake(&mut self, account: Address, amount: u128) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount("zero unstake".into()));
        }
        let mut info = self.stakers.get(&account).copied().unwrap_or_default();
        if info.amount < amount {
            return Err(StakingError::InsufficientStake {
                have: info.amount,
                need: amount,
            });
        }
        self.settle(&mut info)?;
        info.amount -= amount;
        self.rebase_debt(&mut info)?;

        self.total_staked -= amount;
        self.stakers.insert(account, info);
        debug!(account = %account, amount, total_staked = self.total_staked, "unstaked");
        Ok(())
    }

    /// Spread `amount` of rewards over current stakers.
    pub fn distribute(&mut self, amount: u128) -> Result<(), StakingError> {
        let amount = amount.checked_add(self.undistributed).ok_or(MathError::Overflow)?;
        if self.total_staked == 0 {
            self.undistributed = amount;
            return Ok(());
        }
        let increment = mul_div(amount, WAD, self.total_staked)?;
        self.acc_reward_per_share = self
            .acc_reward_per_share
            .checked_add(increment)
            .ok_or(MathError::Overflow)?;
        self.undistributed = 0;
        debug!(amount, index = self.acc_reward_per_share, "rewards distributed");
        Ok(())
    }

    /// Pay out everything `account` has earned by moving that many shares
    /// from the fee sink to `account` on `ledger`.
    ///
    /// # Errors
    ///
    /// [`StakingError::Ledger`] if the fee sink no longer holds the shares;
    /// neither the pool nor the ledger changes then.
    pub fn harvest(&mut self, ledger: &mut ShareLedger, account: Address) -> Result<u128, StakingError> {
        let Some(mut info) = self.stakers.get(&account).copied() else {
            return Ok(0);
        };
        self.settle(&mut info)?;
        self.rebase_debt(&mut info)?;
        let paid = std::mem::take(&mut info.pending);
        if paid > 0 {
            let sink = ledger.fee_sink();
            ledger.transfer(sink, account, paid)?;
            self.last_synced_shares = self.last_synced_shares.saturating_sub(paid);
        }
        if info.amount == 0 {
            self.stakers.remove(&account);
        } else {
            self.stakers.insert(account, info);
        }
        debug!(account = %account, paid, "harvested");
        Ok(paid)
    }

    /// Distribute fee shares the ledger's fee sink gained since the last sync.
    ///
    /// Returns the newly distributed share amount.
    pub fn sync_from_ledger(&mut self, ledger: &ShareLedger) -> Result<u128, StakingError> {
        let current = ledger.shares_of(&ledger.fee_sink());
        let delta = current.saturating_sub(self.last_synced_shares);
        if delta > 0 {
            self.distribute(delta)?;
        }
        self.last_synced_shares = current;
        Ok(delta)
    }
}
