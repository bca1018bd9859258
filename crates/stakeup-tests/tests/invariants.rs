//! Property tests over random operation sequences.

use proptest::prelude::*;

use stakeup_core::constants::WAD;
use stakeup_core::math::normalize;
use stakeup_core::types::{PoolState, TokenSource};
use stakeup_ledger::LedgerSnapshot;
use stakeup_tests::helpers::*;

#[derive(Clone, Copy, Debug)]
enum Op {
    Deposit { who: u8, amount: u128 },
    DepositTby { who: u8, amount: u128 },
    Redeem { who: u8, percent: u128 },
    Rate { bps_up: u128 },
    Poke,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u8..5, 1u128..10_000_000_000).prop_map(|(who, amount)| Op::Deposit { who, amount }),
        (1u8..5, 1u128..10_000_000_000).prop_map(|(who, amount)| Op::DepositTby { who, amount }),
        (1u8..5, 1u128..=100).prop_map(|(who, percent)| Op::Redeem { who, percent }),
        (0u128..500).prop_map(|bps_up| Op::Rate { bps_up }),
        Just(Op::Poke),
    ]
}

fn shares_balance(snap: &LedgerSnapshot) -> bool {
    snap.accounts.values().sum::<u128>() == snap.total_shares
}

fn value_reconciles(snap: &LedgerSnapshot) -> bool {
    let books: u128 = snap.positions.values().map(|p| p.book_value).sum();
    normalize(snap.reserve, 6).unwrap() + books == snap.total_usd
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn ledger_invariants_hold(ops in proptest::collection::vec(op(), 1..40)) {
        let mut env = TestEnv::new(TokenSource::Mock(6));
        env.set_state(env.pool, PoolState::Holding);
        let mut rate = WAD;

        for op in ops {
            let before = env.ledger.snapshot().unwrap();
            let result = match op {
                Op::Deposit { who, amount } => env.ledger.deposit_underlying(user(who), amount).map(|_| ()),
                Op::DepositTby { who, amount } => env.ledger.deposit_tby(user(who), env.pool, amount).map(|_| ()),
                Op::Redeem { who, percent } => {
                    let shares = env.ledger.shares_of(&user(who)) * percent / 100;
                    env.ledger.redeem_st_usd(user(who), shares).map(|_| ())
                }
                Op::Rate { bps_up } => {
                    rate += rate * bps_up / 10_000;
                    env.registry.set_exchange_rate(env.pool, rate);
                    Ok(())
                }
                Op::Poke => env.ledger.poke(env.now).map(|_| ()),
            };

            let after = env.ledger.snapshot().unwrap();
            if result.is_err() {
                prop_assert_eq!(&after, &before);
            }
            prop_assert!(shares_balance(&after));
            prop_assert!(value_reconciles(&after));
        }

        env.ledger.poke(env.now).unwrap();
        let once = env.ledger.snapshot().unwrap();
        prop_assert!(value_reconciles(&once));
        env.ledger.poke(env.now).unwrap();
        prop_assert_eq!(env.ledger.snapshot().unwrap(), once);
    }

    #[test]
    fn fee_split_matches_bps(amount in 1u128..1_000_000_000_000_000) {
        let mut env = TestEnv::new(TokenSource::Mock(6));
        let receipt = env.ledger.deposit_underlying(user(1), amount).unwrap();
        let value = normalize(amount, 6).unwrap();
        prop_assert_eq!(receipt.fee_shares, value / 10_000);
        prop_assert_eq!(receipt.shares + receipt.fee_shares, value);
    }
}
