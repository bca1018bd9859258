//! Fee-sink staking fed by ledger fees.

use stakeup_core::types::TokenSource;
use stakeup_ledger::StakingPool;
use stakeup_tests::helpers::*;

#[test]
fn fees_flow_to_stakers() {
    let mut env = TestEnv::new(TokenSource::Mock(6));
    let mut staking = StakingPool::new();
    staking.stake(user(0x51), 3 * 10u128.pow(18)).unwrap();
    staking.stake(user(0x52), 10u128.pow(18)).unwrap();

    env.deposit(user(1), "1000", false);
    let synced = staking.sync_from_ledger(&env.ledger).unwrap();
    assert_eq!(synced, eth("0.1"));
    assert_eq!(staking.claimable(&user(0x51)).unwrap(), eth("0.075"));
    assert_eq!(staking.claimable(&user(0x52)).unwrap(), eth("0.025"));

    // No new fees: syncing again distributes nothing.
    assert_eq!(staking.sync_from_ledger(&env.ledger).unwrap(), 0);
}

#[test]
fn rewards_persist_between_harvests() {
    let mut env = TestEnv::new(TokenSource::Mock(6));
    let mut staking = StakingPool::new();
    let (a, b) = (user(0x51), user(0x52));
    staking.stake(a, 100).unwrap();
    staking.stake(b, 100).unwrap();

    env.deposit(user(1), "1000", false);
    staking.sync_from_ledger(&env.ledger).unwrap();
    assert_eq!(staking.harvest(&mut env.ledger, a).unwrap(), eth("0.05"));
    assert_eq!(env.ledger.shares_of(&a), eth("0.05"));

    env.deposit(user(2), "2000", false);
    staking.sync_from_ledger(&env.ledger).unwrap();

    // `a` only sees the second round; `b` still holds both.
    assert_eq!(staking.claimable(&a).unwrap(), eth("0.1"));
    assert_eq!(staking.claimable(&b).unwrap(), eth("0.15"));
    assert_eq!(staking.harvest(&mut env.ledger, b).unwrap(), eth("0.15"));
    assert_eq!(staking.harvest(&mut env.ledger, a).unwrap(), eth("0.1"));
    assert_eq!(staking.claimable(&a).unwrap(), 0);
    assert_eq!(staking.claimable(&b).unwrap(), 0);

    // Every fee share has left the sink for a staker.
    assert_eq!(env.ledger.shares_of(&a), eth("0.15"));
    assert_eq!(env.ledger.shares_of(&b), eth("0.15"));
    assert_eq!(env.ledger.shares_of(&env.fee_sink), 0);
}

#[test]
fn harvested_shares_can_be_redeemed() {
    let mut env = TestEnv::new(TokenSource::Mock(6));
    let mut staking = StakingPool::new();
    let staker = user(0x51);
    staking.stake(staker, 1).unwrap();

    env.deposit(user(1), "1000", false);
    staking.sync_from_ledger(&env.ledger).unwrap();
    let paid = staking.harvest(&mut env.ledger, staker).unwrap();
    assert_eq!(paid, eth("0.1"));

    // 50 bps redeem fee goes back to the sink and to the next sync.
    let receipt = env.ledger.redeem_st_usd(staker, paid).unwrap();
    assert_eq!(receipt.payout, env.units("0.0995"));
    assert_eq!(staking.sync_from_ledger(&env.ledger).unwrap(), eth("0.0005"));
}

#[test]
fn redeem_fees_are_distributed_too() {
    let mut env = TestEnv::new(TokenSource::Mock(6));
    let mut staking = StakingPool::new();
    staking.stake(user(0x51), 1).unwrap();

    env.deposit(user(1), "1000", false);
    staking.sync_from_ledger(&env.ledger).unwrap();
    let shares = env.ledger.shares_of(&user(1));
    env.ledger.redeem_st_usd(user(1), shares).unwrap();

    assert_eq!(staking.sync_from_ledger(&env.ledger).unwrap(), eth("4.9995"));
    assert_eq!(staking.claimable(&user(0x51)).unwrap(), eth("5.0995"));
}
