//! Trait interfaces for external collaborators.
//!
//! - [`ExchangeRateOracle`]: per-pool receipt exchange rates
//! - [`PoolFeed`]: pool lifecycle phases and the pool factory's latest pool
//!
//! The share ledger treats both as authoritative and un-validated.
//! [`MemoryRegistry`](crate::registry::MemoryRegistry) implements both for
//! tests and simulation.

use crate::types::{Address, PoolState};

/// Source of receipt-token exchange rates.
pub trait ExchangeRateOracle: Send + Sync {
    /// Exchange rate of `pool`'s receipt token to underlying, 18-decimal fixed point.
    ///
    /// Returns `None` when no rate has been published for the pool.
    fn exchange_rate(&self, pool: &Address) -> Option<u128>;
}

/// Source of pool lifecycle information.
pub trait PoolFeed: Send + Sync {
    /// Current phase of `pool`. Returns `None` for pools the feed does not know.
    fn pool_state(&self, pool: &Address) -> Option<PoolState>;

    /// Unix timestamp at which `pool`'s commit phase ends.
    fn commit_phase_end(&self, pool: &Address) -> Option<u64>;

    /// Pools whose receipt tokens are currently active.
    fn active_pools(&self) -> Vec<Address>;

    /// The most recently created pool, if any.
    fn last_created_pool(&self) -> Option<Address>;

    /// Whether `pool` is in the active set.
    ///
    /// Default implementation scans [`active_pools`](Self::active_pools).
    fn is_active(&self, pool: &Address) -> bool {
        self.active_pools().contains(pool)
    }
}

/// Combined view used by the share ledger.
pub trait PoolRegistry: ExchangeRateOracle + PoolFeed {}

impl<T: ExchangeRateOracle + PoolFeed> PoolRegistry for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedFeed {
        rates: HashMap<Address, u128>,
        active: Vec<Address>,
    }

    impl ExchangeRateOracle for FixedFeed {
        fn exchange_rate(&self, pool: &Address) -> Option<u128> {
            self.rates.get(pool).copied()
        }
    }

    impl PoolFeed for FixedFeed {
        fn pool_state(&self, pool: &Address) -> Option<PoolState> {
            self.active.contains(pool).then_some(PoolState::Holding)
        }

        fn commit_phase_end(&self, _pool: &Address) -> Option<u64> {
            None
        }

        fn active_pools(&self) -> Vec<Address> {
            self.active.clone()
        }

        fn last_created_pool(&self) -> Option<Address> {
            self.active.last().copied()
        }
    }

    fn feed() -> FixedFeed {
        let pool = Address::from_seed(7);
        FixedFeed {
            rates: HashMap::from([(pool, 1)]),
            active: vec![pool],
        }
    }

    #[test]
    fn default_is_active_uses_active_set() {
        let f = feed();
        assert!(f.is_active(&Address::from_seed(7)));
        assert!(!f.is_active(&Address::from_seed(8)));
    }

    #[test]
    fn registry_is_object_safe() {
        let f = feed();
        let dyn_f: &dyn PoolRegistry = &f;
        assert_eq!(dyn_f.exchange_rate(&Address::from_seed(7)), Some(1));
        assert_eq!(dyn_f.last_created_pool(), Some(Address::from_seed(7)));
    }
}
