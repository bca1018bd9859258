//! In-memory pool registry implementing [`ExchangeRateOracle`] and [`PoolFeed`].
//!
//! Interior state sits behind a `RwLock` so a registry shared through an
//! `Arc` can be updated while a ledger holds a reference to it.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::traits::{ExchangeRateOracle, PoolFeed};
use crate::types::{Address, PoolState};

#[derive(Clone, Debug, Default)]
struct PoolRecord {
    state: PoolState,
    commit_phase_end: Option<u64>,
    exchange_rate: Option<u128>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    pools: HashMap<Address, PoolRecord>,
    active: Vec<Address>,
    last_created: Option<Address>,
}

/// Settable registry of pools, rates and phases.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    inner: RwLock<RegistryInner>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly created pool: marks it active and the latest created pool.
    pub fn register_pool(&self, pool: Address, state: PoolState, commit_phase_end: u64) {
        let mut inner = self.inner.write();
        inner.pools.insert(
            pool,
            PoolRecord {
                state,
                commit_phase_end: Some(commit_phase_end),
                exchange_rate: None,
            },
        );
        if !inner.active.contains(&pool) {
            inner.active.push(pool);
        }
        inner.last_created = Some(pool);
    }

    /// Publish (or replace) the exchange rate of `pool`.
    pub fn set_exchange_rate(&self, pool: Address, rate: u128) {
        self.inner.write().pools.entry(pool).or_default().exchange_rate = Some(rate);
    }

    /// Withdraw the published rate of `pool`.
    pub fn clear_exchange_rate(&self, pool: &Address) {
        if let Some(record) = self.inner.write().pools.get_mut(pool) {
            record.exchange_rate = None;
        }
    }

    pub fn set_state(&self, pool: Address, state: PoolState) {
        self.inner.write().pools.entry(pool).or_default().state = state;
    }

    pub fn set_commit_phase_end(&self, pool: Address, timestamp: u64) {
        self.inner.write().pools.entry(pool).or_default().commit_phase_end = Some(timestamp);
    }

    /// Replace the active set.
    pub fn set_active_pools(&self, pools: Vec<Address>) {
        let mut inner = self.inner.write();
        for pool in &pools {
            inner.pools.entry(*pool).or_default();
        }
        inner.active = pools;
    }

    pub fn set_last_created_pool(&self, pool: Address) {
        self.inner.write().last_created = Some(pool);
    }
}

impl ExchangeRateOracle for MemoryRegistry {
    fn exchange_rate(&self, pool: &Address) -> Option<u128> {
        self.inner.read().pools.get(pool).and_then(|r| r.exchange_rate)
    }
}

impl PoolFeed for MemoryRegistry {
    fn pool_state(&self, pool: &Address) -> Option<PoolState> {
        self.inner.read().pools.get(pool).map(|r| r.state)
    }

    fn commit_phase_end(&self, pool: &Address) -> Option<u64> {
        self.inner.read().pools.get(pool).and_then(|r| r.commit_phase_end)
    }

    fn active_pools(&self) -> Vec<Address> {
        self.inner.read().active.clone()
    }

    fn last_created_pool(&self) -> Option<Address> {
        self.inner.read().last_created
    }
}
