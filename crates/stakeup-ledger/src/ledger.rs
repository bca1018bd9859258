//! The share ledger.
//!
//! Value is tracked in 18-decimal units; the underlying reserve and receipt
//! positions are kept in the token's native decimals. Between pokes the
//! ledger maintains `total_usd == normalize(reserve) + sum(book values)`.
//!
//! Every mutating operation first computes its full effect and only then
//! writes it back, so an error leaves the ledger untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stakeup_core::constants::WAD;
use stakeup_core::error::{ConfigError, LedgerError, MathError};
use stakeup_core::math::{bps_of, denormalize, div_wad, mul_div, mul_wad, normalize};
use stakeup_core::traits::PoolRegistry;
use stakeup_core::types::{Address, PoolState};

use crate::config::LedgerConfig;

/// Receipt tokens of one pool held by the ledger.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Receipt token balance, native decimals.
    pub tby: u128,
    /// Value credited when the receipts entered the ledger.
    pub deposited_value: u128,
    /// Value at the last revaluation.
    pub book_value: u128,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    pub account: Address,
    /// Gross value deposited (18 decimals).
    pub value: u128,
    /// Shares credited to the depositor.
    pub shares: u128,
    /// Shares credited to the fee sink.
    pub fee_shares: u128,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedeemReceipt {
    pub account: Address,
    /// Shares taken from the account (burned plus fee).
    pub shares: u128,
    pub fee_shares: u128,
    /// Value of all redeemed shares before the fee.
    pub value_out: u128,
    /// Underlying paid out, native decimals.
    pub payout: u128,
    /// Performance fee taken when a pool settled during this redemption.
    pub performance_fee: u128,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementReport {
    pub pool: Address,
    /// Underlying received for the receipts, native decimals.
    pub proceeds: u128,
    pub realized_value: u128,
    pub yield_value: u128,
    pub performance_fee: u128,
    /// Shares minted to the fee sink for the performance fee.
    pub fee_shares: u128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PokeReport {
    pub total_usd_before: u128,
    pub total_usd_after: u128,
    /// Pool and native amount of idle underlying committed, if any.
    pub deployed: Option<(Address, u128)>,
    /// Active pools valued at zero because no rate was published.
    pub zero_valued_pools: Vec<Address>,
}

/// Serializable view of the whole ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub total_shares: u128,
    pub total_usd: u128,
    /// `total_usd / total_shares`, 18 decimals.
    pub exchange_rate: u128,
    pub reserve: u128,
    pub mint_bps: u16,
    pub redeem_bps: u16,
    pub performance_bps: u16,
    pub fee_sink: Address,
    pub accounts: BTreeMap<Address, u128>,
    pub positions: BTreeMap<Address, Position>,
}

/// Result of a settlement, computed but not yet applied.
struct SettlementPlan {
    report: SettlementReport,
    total_usd: u128,
    total_shares: u128,
    reserve: u128,
}

/// Positions revalued at current rates, computed but not yet applied.
struct Revaluation {
    positions: BTreeMap<Address, Position>,
    total_usd: u128,
    zero_valued_pools: Vec<Address>,
}

/// Result of a redemption, computed but not yet applied.
struct RedemptionPlan {
    receipt: RedeemReceipt,
    burned: u128,
    value_paid: u128,
}

/// Exchange-rate bookkeeping for stUSD shares.
pub struct ShareLedger {
    config: LedgerConfig,
    registry: Arc<dyn PoolRegistry>,
    total_shares: u128,
    total_usd: u128,
    shares: HashMap<Address, u128>,
    reserve: u128,
    positions: BTreeMap<Address, Position>,
}

impl std::fmt::Debug for ShareLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareLedger")
            .field("config", &self.config)
            .field("total_shares", &self.total_shares)
            .field("total_usd", &self.total_usd)
            .field("reserve", &self.reserve)
            .field("positions", &self.positions)
            .finish_non_exhaustive()
    }
}

impl ShareLedger {
    /// Create an empty ledger reading rates and pool phases from `registry`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by [`LedgerConfig::validate`].
    pub fn new(config: LedgerConfig, registry: Arc<dyn PoolRegistry>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            total_shares: 0,
            total_usd: 0,
            shares: HashMap::new(),
            reserve: 0,
            positions: BTreeMap::new(),
        })
    }

    // --- accessors ---

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn get_mint_bps(&self) -> u16 {
        self.config.mint_bps
    }

    pub fn get_redeem_bps(&self) -> u16 {
        self.config.redeem_bps
    }

    pub fn get_performance_bps(&self) -> u16 {
        self.config.performance_bps
    }

    pub fn fee_sink(&self) -> Address {
        self.config.fee_sink
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn total_usd(&self) -> u128 {
        self.total_usd
    }

    /// Circulating stUSD: equal to the total value held.
    pub fn circulating_supply(&self) -> u128 {
        self.total_usd
    }

    /// Idle underlying, native decimals.
    pub fn remaining_balance(&self) -> u128 {
        self.reserve
    }

    pub fn shares_of(&self, account: &Address) -> u128 {
        self.shares.get(account).copied().unwrap_or(0)
    }

    /// Rebased stUSD balance: the account's share of `total_usd`.
    pub fn balance_of(&self, account: &Address) -> Result<u128, LedgerError> {
        self.value_of(self.shares_of(account))
    }

    pub fn position(&self, pool: &Address) -> Option<&Position> {
        self.positions.get(pool)
    }

    /// `total_usd / total_shares` in 18 decimals; one while no shares exist.
    pub fn exchange_rate(&self) -> Result<u128, LedgerError> {
        if self.total_shares == 0 {
            return Ok(WAD);
        }
        Ok(div_wad(self.total_usd, self.total_shares)?)
    }

    /// Serializable copy of all balances and positions.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        Ok(LedgerSnapshot {
            total_shares: self.total_shares,
            total_usd: self.total_usd,
            exchange_rate: self.exchange_rate()?,
            reserve: self.reserve,
            mint_bps: self.config.mint_bps,
            redeem_bps: self.config.redeem_bps,
            performance_bps: self.config.performance_bps,
            fee_sink: self.config.fee_sink,
            accounts: self.shares.iter().map(|(a, s)| (*a, *s)).collect(),
            positions: self.positions.clone(),
        })
    }

    // --- conversions ---

    fn shares_for(&self, value: u128, total_shares: u128, total_usd: u128) -> Result<u128, MathError> {
        if total_shares == 0 {
            return Ok(value);
        }
        mul_div(value, total_shares, total_usd)
    }

    fn value_of(&self, shares: u128) -> Result<u128, LedgerError> {
        if self.total_shares == 0 {
            return Ok(0);
        }
        Ok(mul_div(shares, self.total_usd, self.total_shares)?)
    }

    fn normalize(&self, amount: u128) -> Result<u128, MathError> {
        normalize(amount, self.config.underlying_decimals)
    }

    fn denormalize(&self, value: u128) -> Result<u128, MathError> {
        denormalize(value, self.config.underlying_decimals)
    }

    /// Revalue `positions` in active pools at their published rates.
    ///
    /// A pool without a rate counts as zero, or fails under `strict_rates`.
    fn revalue(&self, mut positions: BTreeMap<Address, Position>, reserve: u128) -> Result<Revaluation, LedgerError> {
        let mut zero_valued_pools = Vec::new();
        for (pool, position) in positions.iter_mut() {
            if !self.registry.is_active(pool) {
                continue;
            }
            match self.registry.exchange_rate(pool) {
                Some(rate) => {
                    position.book_value = mul_wad(self.normalize(position.tby)?, rate)?;
                }
                None if self.config.strict_rates => {
                    return Err(LedgerError::StaleOrMissingRate(*pool));
                }
                None => {
                    warn!(pool = %pool, tby = position.tby, "no exchange rate; valuing position at zero");
                    position.book_value = 0;
                    zero_valued_pools.push(*pool);
                }
            }
        }

        let mut total_usd = self.normalize(reserve)?;
        for position in positions.values() {
            total_usd = total_usd.checked_add(position.book_value).ok_or(MathError::Overflow)?;
        }
        Ok(Revaluation {
            positions,
            total_usd,
            zero_valued_pools,
        })
    }

    /// Credit `value` to `account` net of the mint fee, pricing shares
    /// against the freshly revalued `book`. Commits `book` and `reserve`.
    fn mint_for_value(
        &mut self,
        account: Address,
        value: u128,
        book: Revaluation,
        reserve: u128,
    ) -> Result<DepositReceipt, LedgerError> {
        let gross = self.shares_for(value, self.total_shares, book.total_usd)?;
        let fee_value = bps_of(value, self.config.mint_bps)?;
        let fee_shares = self.shares_for(fee_value, self.total_shares, book.total_usd)?;
        let net = gross - fee_shares;
        if net == 0 {
            return Err(LedgerError::InvalidAmount("deposit too small to mint shares".into()));
        }
        let total_shares = self.total_shares.checked_add(gross).ok_or(MathError::Overflow)?;
        let total_usd = book.total_usd.checked_add(value).ok_or(MathError::Overflow)?;

        self.total_shares = total_shares;
        self.total_usd = total_usd;
        self.positions = book.positions;
        self.reserve = reserve;
        *self.shares.entry(account).or_insert(0) += net;
        if fee_shares > 0 {
            *self.shares.entry(self.config.fee_sink).or_insert(0) += fee_shares;
        }
        Ok(DepositReceipt {
            account,
            value,
            shares: net,
            fee_shares,
        })
    }

    // --- deposits ---

    /// Deposit `amount` of underlying (native decimals) at 1:1 value.
    ///
    /// Positions in active pools are revalued at their current rates before
    /// the new shares are priced, so a deposit never buys into yield that a
    /// later `poke` would credit to existing holders.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] for a zero amount
    /// - [`LedgerError::StaleOrMissingRate`] under `strict_rates` when an
    ///   active pool has no rate
    pub fn deposit_underlying(&mut self, account: Address, amount: u128) -> Result<DepositReceipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("zero underlying deposit".into()));
        }
        let value = self.normalize(amount)?;
        let reserve = self.reserve.checked_add(amount).ok_or(MathError::Overflow)?;
        let book = self.revalue(self.positions.clone(), self.reserve)?;
        let receipt = self.mint_for_value(account, value, book, reserve)?;
        debug!(
            account = %account,
            amount,
            shares = receipt.shares,
            fee_shares = receipt.fee_shares,
            "underlying deposited"
        );
        Ok(receipt)
    }

    /// Deposit `amount` receipt tokens of `pool`, valued at the pool's current rate.
    ///
    /// Existing positions are revalued first, as in
    /// [`deposit_underlying`](Self::deposit_underlying).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] for a zero amount or zero value
    /// - [`LedgerError::UnknownPool`] if the pool is not active
    /// - [`LedgerError::PoolClosed`] once the pool has settled or exited
    /// - [`LedgerError::StaleOrMissingRate`] if no rate is published
    pub fn deposit_tby(&mut self, account: Address, pool: Address, amount: u128) -> Result<DepositReceipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("zero receipt deposit".into()));
        }
        if !self.registry.is_active(&pool) {
            return Err(LedgerError::UnknownPool(pool));
        }
        let state = self.registry.pool_state(&pool).unwrap_or_default();
        if !state.accepts_receipts() {
            return Err(LedgerError::PoolClosed { pool, state });
        }
        let rate = self
            .registry
            .exchange_rate(&pool)
            .ok_or(LedgerError::StaleOrMissingRate(pool))?;
        let value = mul_wad(self.normalize(amount)?, rate)?;
        if value == 0 {
            return Err(LedgerError::InvalidAmount("receipt deposit has zero value".into()));
        }

        let mut book = self.revalue(self.positions.clone(), self.reserve)?;
        let mut position = book.positions.get(&pool).copied().unwrap_or_default();
        position.tby = position.tby.checked_add(amount).ok_or(MathError::Overflow)?;
        position.deposited_value = position
            .deposited_value
            .checked_add(value)
            .ok_or(MathError::Overflow)?;
        position.book_value = position.book_value.checked_add(value).ok_or(MathError::Overflow)?;
        book.positions.insert(pool, position);

        let receipt = self.mint_for_value(account, value, book, self.reserve)?;
        debug!(
            account = %account,
            pool = %pool,
            amount,
            rate,
            shares = receipt.shares,
            "receipts deposited"
        );
        Ok(receipt)
    }

    // --- redemptions ---

    fn plan_redemption(
        &self,
        account: Address,
        shares: u128,
        total_shares: u128,
        total_usd: u128,
        reserve: u128,
    ) -> Result<RedemptionPlan, LedgerError> {
        if shares == 0 {
            return Err(LedgerError::InvalidAmount("zero shares".into()));
        }
        let have = self.shares_of(&account);
        if have < shares {
            return Err(LedgerError::InsufficientShares { have, need: shares });
        }
        let value_out = mul_div(shares, total_usd, total_shares)?;
        let fee_shares = bps_of(shares, self.config.redeem_bps)?;
        let burned = shares - fee_shares;
        let net_value = mul_div(burned, total_usd, total_shares)?;
        let payout = self.denormalize(net_value)?;
        if payout > reserve {
            return Err(LedgerError::InsufficientLiquidity { have: reserve, need: payout });
        }
        Ok(RedemptionPlan {
            receipt: RedeemReceipt {
                account,
                shares,
                fee_shares,
                value_out,
                payout,
                performance_fee: 0,
            },
            burned,
            value_paid: self.normalize(payout)?,
        })
    }

    fn apply_redemption(&mut self, plan: &RedemptionPlan) {
        let receipt = &plan.receipt;
        let remaining = self.shares_of(&receipt.account) - receipt.shares;
        if remaining == 0 {
            self.shares.remove(&receipt.account);
        } else {
            self.shares.insert(receipt.account, remaining);
        }
        if receipt.fee_shares > 0 {
            *self.shares.entry(self.config.fee_sink).or_insert(0) += receipt.fee_shares;
        }
        self.total_shares -= plan.burned;
        self.total_usd -= plan.value_paid;
        self.reserve -= receipt.payout;
    }

    /// Redeem `shares` for idle underlying, net of the redeem fee.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] for zero shares
    /// - [`LedgerError::InsufficientShares`] if the account holds fewer
    /// - [`LedgerError::InsufficientLiquidity`] if the idle balance cannot cover the payout
    pub fn redeem_st_usd(&mut self, account: Address, shares: u128) -> Result<RedeemReceipt, LedgerError> {
        let plan = self.plan_redemption(account, shares, self.total_shares, self.total_usd, self.reserve)?;
        self.apply_redemption(&plan);
        debug!(
            account = %account,
            shares,
            fee_shares = plan.receipt.fee_shares,
            payout = plan.receipt.payout,
            "stUSD redeemed"
        );
        Ok(plan.receipt)
    }

    /// Move `shares` from `from` to `to` without touching the totals.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] for zero shares
    /// - [`LedgerError::InsufficientShares`] if `from` holds fewer
    pub fn transfer(&mut self, from: Address, to: Address, shares: u128) -> Result<(), LedgerError> {
        if shares == 0 {
            return Err(LedgerError::InvalidAmount("zero shares".into()));
        }
        let have = self.shares_of(&from);
        if have < shares {
            return Err(LedgerError::InsufficientShares { have, need: shares });
        }
        if from == to {
            return Ok(());
        }
        if have == shares {
            self.shares.remove(&from);
        } else {
            self.shares.insert(from, have - shares);
        }
        *self.shares.entry(to).or_insert(0) += shares;
        debug!(from = %from, to = %to, shares, "stUSD transferred");
        Ok(())
    }

    fn require_settled(&self, pool: Address) -> Result<(), LedgerError> {
        let state = self
            .registry
            .pool_state(&pool)
            .ok_or(LedgerError::UnknownPool(pool))?;
        if !state.is_settled() {
            return Err(LedgerError::PoolNotSettled { pool, state });
        }
        Ok(())
    }

    fn plan_settlement(&self, pool: Address) -> Result<Option<SettlementPlan>, LedgerError> {
        self.require_settled(pool)?;
        let Some(position) = self.positions.get(&pool) else {
            return Ok(None);
        };
        let rate = self
            .registry
            .exchange_rate(&pool)
            .ok_or(LedgerError::StaleOrMissingRate(pool))?;
        let proceeds = self.denormalize(mul_wad(self.normalize(position.tby)?, rate)?)?;
        let realized_value = self.normalize(proceeds)?;
        let yield_value = realized_value.saturating_sub(position.deposited_value);
        let performance_fee = bps_of(yield_value, self.config.performance_bps)?;

        let total_usd = self
            .total_usd
            .checked_sub(position.book_value)
            .and_then(|u| u.checked_add(realized_value))
            .ok_or(MathError::Overflow)?;
        // Minted so the sink's new shares are worth exactly the fee afterwards.
        let fee_shares = if performance_fee == 0 || self.total_shares == 0 || total_usd <= performance_fee {
            0
        } else {
            mul_div(performance_fee, self.total_shares, total_usd - performance_fee)?
        };
        let total_shares = self.total_shares.checked_add(fee_shares).ok_or(MathError::Overflow)?;
        let reserve = self.reserve.checked_add(proceeds).ok_or(MathError::Overflow)?;

        Ok(Some(SettlementPlan {
            report: SettlementReport {
                pool,
                proceeds,
                realized_value,
                yield_value,
                performance_fee,
                fee_shares,
            },
            total_usd,
            total_shares,
            reserve,
        }))
    }

    fn apply_settlement(&mut self, plan: &SettlementPlan) {
        self.positions.remove(&plan.report.pool);
        self.total_usd = plan.total_usd;
        self.total_shares = plan.total_shares;
        self.reserve = plan.reserve;
        if plan.report.fee_shares > 0 {
            *self.shares.entry(self.config.fee_sink).or_insert(0) += plan.report.fee_shares;
        }
        info!(
            pool = %plan.report.pool,
            proceeds = plan.report.proceeds,
            yield_value = plan.report.yield_value,
            performance_fee = plan.report.performance_fee,
            "pool position settled"
        );
    }

    /// Convert the ledger's receipts in a settled pool back into underlying,
    /// charging the performance fee on the yield.
    ///
    /// Returns `None` when the ledger holds no receipts of `pool`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownPool`] if the feed does not know the pool
    /// - [`LedgerError::PoolNotSettled`] unless the pool is in `FinalWithdraw`
    /// - [`LedgerError::StaleOrMissingRate`] if the final rate is missing
    pub fn settle_pool(&mut self, pool: Address) -> Result<Option<SettlementReport>, LedgerError> {
        let plan = self.plan_settlement(pool)?;
        Ok(plan.map(|p| {
            self.apply_settlement(&p);
            p.report
        }))
    }

    /// Redeem `shares` against a settled pool.
    ///
    /// Settles the ledger's position in `pool` first when one remains, then
    /// redeems as [`redeem_st_usd`](Self::redeem_st_usd) does. Both steps
    /// apply together or not at all.
    pub fn redeem_underlying(
        &mut self,
        account: Address,
        pool: Address,
        shares: u128,
    ) -> Result<RedeemReceipt, LedgerError> {
        let settlement = self.plan_settlement(pool)?;
        let (total_shares, total_usd, reserve) = match &settlement {
            Some(s) => (s.total_shares, s.total_usd, s.reserve),
            None => (self.total_shares, self.total_usd, self.reserve),
        };
        let mut plan = self.plan_redemption(account, shares, total_shares, total_usd, reserve)?;

        if let Some(s) = &settlement {
            self.apply_settlement(s);
            plan.receipt.performance_fee = s.report.performance_fee;
        }
        self.apply_redemption(&plan);
        debug!(
            account = %account,
            pool = %pool,
            shares,
            payout = plan.receipt.payout,
            "redeemed against settled pool"
        );
        Ok(plan.receipt)
    }

    // --- poke ---

    fn in_deploy_window(&self, pool: &Address, now: u64) -> bool {
        if self.registry.pool_state(pool) != Some(PoolState::Commit) {
            return false;
        }
        match self.registry.commit_phase_end(pool) {
            Some(end) => now < end && now.saturating_add(self.config.auto_deploy_window_secs) >= end,
            None => false,
        }
    }

    /// Re-sync `total_usd` from the rate feed and deploy idle underlying.
    ///
    /// Idle underlying moves into the most recently created pool while that
    /// pool is in `Commit` and `now` falls within the deployment window before
    /// its commit phase ends. Positions in active pools are then revalued at
    /// their published rates; a pool without a rate counts as zero unless
    /// `strict_rates` is set. Shares are never minted or burned.
    ///
    /// # Errors
    ///
    /// [`LedgerError::StaleOrMissingRate`] under `strict_rates` when an active
    /// pool with a position has no rate.
    pub fn poke(&mut self, now: u64) -> Result<PokeReport, LedgerError> {
        let mut positions = self.positions.clone();
        let mut reserve = self.reserve;

        let deployed = match self.registry.last_created_pool() {
            Some(pool) if reserve > 0 && self.in_deploy_window(&pool, now) => {
                let amount = reserve;
                let value = self.normalize(amount)?;
                let position = positions.entry(pool).or_default();
                position.tby = position.tby.checked_add(amount).ok_or(MathError::Overflow)?;
                position.deposited_value = position
                    .deposited_value
                    .checked_add(value)
                    .ok_or(MathError::Overflow)?;
                position.book_value = position.book_value.checked_add(value).ok_or(MathError::Overflow)?;
                reserve = 0;
                Some((pool, amount))
            }
            _ => None,
        };

        let book = self.revalue(positions, reserve)?;
        let report = PokeReport {
            total_usd_before: self.total_usd,
            total_usd_after: book.total_usd,
            deployed,
            zero_valued_pools: book.zero_valued_pools,
        };
        self.positions = book.positions;
        self.reserve = reserve;
        self.total_usd = book.total_usd;

        if let Some((pool, amount)) = report.deployed {
            info!(pool = %pool, amount, "deployed idle underlying");
        }
        debug!(
            before = report.total_usd_before,
            after = report.total_usd_after,
            "ledger poked"
        );
        Ok(report)
    }
}
