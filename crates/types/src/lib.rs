//! Core types for the shield accounting core.
//!
//! Everything here is plain data: records persisted by the store, the
//! multi-denomination amounts they carry, and the half-to-even decimal helpers used for
//! premium accounting and withdrawal apportionment.

mod coins;
mod decimal;
mod genesis;
mod identifiers;
mod params;
mod pool;
mod provider;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use coins::{Coin, Coins, CoinsError, DecCoins, MixedCoins, MixedDecCoins};
pub use decimal::{div_half_even, mul_half_even, truncate_units, DecimalError};
pub use radix_common::math::Decimal;
pub use genesis::GenesisState;
pub use identifiers::{Address, PoolId};
pub use params::{PoolParams, AVERAGE_BLOCK_TIME_SECS};
pub use pool::{Pool, PoolEnd};
pub use provider::{Collateral, Provider, Withdrawal};
