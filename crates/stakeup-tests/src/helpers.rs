//! Shared helpers for scenario tests.
//!
//! Every test builds its own [`TestEnv`]; nothing is shared between tests.

use std::sync::Arc;

use stakeup_core::constants::{ONE_DAY, WAD};
use stakeup_core::math::parse_units;
use stakeup_core::registry::MemoryRegistry;
use stakeup_core::types::{Address, PoolState, TokenInfo, TokenSource};
use stakeup_ledger::{DepositReceipt, LedgerConfig, ShareLedger};

/// Start of every scenario clock.
pub const GENESIS: u64 = 1_700_000_000;

/// Commit phase length of freshly created pools.
pub const COMMIT_PHASE: u64 = 3 * ONE_DAY;

/// Deterministic account from a seed byte.
pub fn user(seed: u8) -> Address {
    Address::from_seed(seed)
}

/// 18-decimal value from a decimal string.
pub fn eth(s: &str) -> u128 {
    parse_units(s, 18).unwrap()
}

/// One ledger wired to its own in-memory registry and clock.
pub struct TestEnv {
    pub registry: Arc<MemoryRegistry>,
    pub ledger: ShareLedger,
    pub underlying: TokenInfo,
    pub fee_sink: Address,
    /// Pool created with the environment, in its commit phase.
    pub pool: Address,
    pub now: u64,
    next_pool_seed: u8,
}

impl TestEnv {
    pub fn new(source: TokenSource) -> Self {
        Self::with_config(source, |_| {})
    }

    /// Build an environment, letting `tweak` adjust the ledger config.
    pub fn with_config(source: TokenSource, tweak: impl FnOnce(&mut LedgerConfig)) -> Self {
        let underlying = source.resolve(Address::from_seed(0xc0)).unwrap();
        let fee_sink = Address::from_seed(0xfe);
        let mut config = LedgerConfig {
            underlying_decimals: underlying.decimals,
            ..LedgerConfig::with_fee_sink(fee_sink)
        };
        tweak(&mut config);

        let registry = Arc::new(MemoryRegistry::new());
        let ledger = ShareLedger::new(config, registry.clone()).unwrap();
        let mut env = Self {
            registry,
            ledger,
            underlying,
            fee_sink,
            pool: Address::ZERO,
            now: GENESIS,
            next_pool_seed: 0x10,
        };
        env.pool = env.create_pool();
        env
    }

    /// Native amount of the underlying from a decimal string.
    pub fn units(&self, s: &str) -> u128 {
        parse_units(s, self.underlying.decimals).unwrap()
    }

    /// Register a new pool in `Commit`, ending [`COMMIT_PHASE`] from now, at rate 1.
    pub fn create_pool(&mut self) -> Address {
        let pool = Address::from_seed(self.next_pool_seed);
        self.next_pool_seed += 1;
        self.registry.register_pool(pool, PoolState::Commit, self.now + COMMIT_PHASE);
        self.registry.set_exchange_rate(pool, WAD);
        pool
    }

    pub fn set_rate(&self, pool: Address, rate: &str) {
        self.registry.set_exchange_rate(pool, eth(rate));
    }

    pub fn set_state(&self, pool: Address, state: PoolState) {
        self.registry.set_state(pool, state);
    }

    pub fn warp(&mut self, secs: u64) {
        self.now += secs;
    }

    pub fn warp_to(&mut self, timestamp: u64) {
        assert!(timestamp >= self.now, "clock cannot go backwards");
        self.now = timestamp;
    }

    /// Deposit `amount` of underlying, or receipts of the default pool when `tby`.
    pub fn deposit(&mut self, account: Address, amount: &str, tby: bool) -> DepositReceipt {
        let amount = self.units(amount);
        if tby {
            self.ledger.deposit_tby(account, self.pool, amount).unwrap()
        } else {
            self.ledger.deposit_underlying(account, amount).unwrap()
        }
    }

    pub fn poke(&mut self) -> stakeup_ledger::PokeReport {
        self.ledger.poke(self.now).unwrap()
    }
}
