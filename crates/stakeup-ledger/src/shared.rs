//! Thread-safe handle to one [`ShareLedger`].
//!
//! A single mutex guards the ledger so no reader ever sees `total_shares`
//! and `total_usd` from different operations.

use std::sync::Arc;

use parking_lot::Mutex;

use stakeup_core::error::LedgerError;
use stakeup_core::types::Address;

use crate::ledger::{DepositReceipt, LedgerSnapshot, PokeReport, RedeemReceipt, ShareLedger};

/// Cloneable, lock-guarded ledger.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<Mutex<ShareLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: ShareLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Run `f` with exclusive access to the ledger.
    pub fn with<R>(&self, f: impl FnOnce(&mut ShareLedger) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn deposit_underlying(&self, account: Address, amount: u128) -> Result<DepositReceipt, LedgerError> {
        self.inner.lock().deposit_underlying(account, amount)
    }

    pub fn deposit_tby(&self, account: Address, pool: Address, amount: u128) -> Result<DepositReceipt, LedgerError> {
        self.inner.lock().deposit_tby(account, pool, amount)
    }

    pub fn redeem_st_usd(&self, account: Address, shares: u128) -> Result<RedeemReceipt, LedgerError> {
        self.inner.lock().redeem_st_usd(account, shares)
    }

    pub fn redeem_underlying(
        &self,
        account: Address,
        pool: Address,
        shares: u128,
    ) -> Result<RedeemReceipt, LedgerError> {
        self.inner.lock().redeem_underlying(account, pool, shares)
    }

    pub fn transfer(&self, from: Address, to: Address, shares: u128) -> Result<(), LedgerError> {
        self.inner.lock().transfer(from, to, shares)
    }

    pub fn poke(&self, now: u64) -> Result<PokeReport, LedgerError> {
        self.inner.lock().poke(now)
    }

    /// Consistent `(total_shares, total_usd)` pair.
    pub fn totals(&self) -> (u128, u128) {
        let ledger = self.inner.lock();
        (ledger.total_shares(), ledger.total_usd())
    }

    pub fn shares_of(&self, account: &Address) -> u128 {
        self.inner.lock().shares_of(account)
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        self.inner.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use stakeup_core::registry::MemoryRegistry;
    use std::thread;

    fn shared() -> SharedLedger {
        let registry = Arc::new(MemoryRegistry::new());
        let ledger = ShareLedger::new(LedgerConfig::with_fee_sink(Address::from_seed(0xfe)), registry).unwrap();
        SharedLedger::new(ledger)
    }

    #[test]
    fn concurrent_deposits_keep_totals_consistent() {
        let ledger = shared();
        let handles: Vec<_> = (1..=8u8)
            .map(|i| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        ledger.deposit_underlying(Address::from_seed(i), 1_000_000).unwrap();
                        let (shares, usd) = ledger.totals();
                        // Nothing but 1:1 deposits: shares always equal value.
                        assert_eq!(shares, usd);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = ledger.snapshot().unwrap();
        assert_eq!(snap.reserve, 8 * 50 * 1_000_000);
        assert_eq!(snap.accounts.values().sum::<u128>(), snap.total_shares);
    }

    #[test]
    fn with_gives_mutable_access() {
        let ledger = shared();
        ledger.with(|l| l.deposit_underlying(Address::from_seed(1), 5_000_000)).unwrap();
        assert_eq!(ledger.with(|l| l.remaining_balance()), 5_000_000);
        assert!(ledger.shares_of(&Address::from_seed(1)) > 0);
    }
}
