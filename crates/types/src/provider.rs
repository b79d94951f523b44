//! Provider and per-pool collateral records.

use crate::{Address, Coins, PoolId};
use radix_common::ScryptoSbor;

/// A provider's aggregate collateral position.
#[derive(Debug, Clone, PartialEq, Eq, ScryptoSbor)]
pub struct Provider {
    pub address: Address,

    /// Total committed across all pools.
    pub collateral: Coins,

    /// Bonding-denomination balance not yet committed.
    pub available: u128,

    /// Bonding-denomination amount pending release.
    pub withdraw: u128,
}

impl Provider {
    /// Create a provider with nothing committed.
    pub fn new(address: Address, available: u128) -> Self {
        Self {
            address,
            collateral: Coins::new(),
            available,
            withdraw: 0,
        }
    }

    /// Committed collateral not already being withdrawn.
    pub fn withdrawable(&self, bond_denom: &str) -> u128 {
        self.collateral
            .amount_of(bond_denom)
            .saturating_sub(self.withdraw)
    }
}

/// A provider's commitment to one pool.
#[derive(Debug, Clone, PartialEq, Eq, ScryptoSbor)]
pub struct Collateral {
    pub pool_id: PoolId,
    pub provider: Address,

    /// Amount committed to the pool.
    pub amount: Coins,

    /// Portion of `amount` currently being released.
    pub withdrawing: Coins,
}

impl Collateral {
    pub fn new(pool_id: PoolId, provider: Address, amount: Coins) -> Self {
        Self {
            pool_id,
            provider,
            amount,
            withdrawing: Coins::new(),
        }
    }

    /// Committed amount not already being withdrawn.
    pub fn withdrawable(&self, bond_denom: &str) -> u128 {
        self.amount
            .amount_of(bond_denom)
            .saturating_sub(self.withdrawing.amount_of(bond_denom))
    }
}

/// A queued collateral release.
#[derive(Debug, Clone, PartialEq, Eq, ScryptoSbor)]
pub struct Withdrawal {
    pub pool_id: PoolId,
    pub provider: Address,
    pub amount: Coins,

    /// Unix time (seconds) at which the release settles.
    pub completion_time: u64,
}
