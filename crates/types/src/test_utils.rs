//! Record fixtures for tests.

use crate::{Address, Coins, MixedDecCoins, Pool, PoolEnd, PoolId};

/// Bonding denomination used across fixtures.
pub const TEST_BOND_DENOM: &str = "ustake";

/// An amount in the test bonding denomination.
pub fn bond(amount: u128) -> Coins {
    Coins::single(TEST_BOND_DENOM, amount)
}

pub fn test_address(name: &str) -> Address {
    Address::new(format!("shield1{}", name))
}

/// An active, time-bounded pool with no premium.
pub fn test_pool(id: u64, shield: u128, end_time: u64) -> Pool {
    Pool::new(
        PoolId(id),
        bond(shield),
        MixedDecCoins::default(),
        "sponsor",
        1,
        PoolEnd::Time { end_time },
    )
}
