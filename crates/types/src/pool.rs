//! Coverage pool records.

use crate::{Coins, MixedDecCoins, PoolId};
use radix_common::ScryptoSbor;

/// When a pool's coverage ends.
///
/// Coverage is expressed either in wall-clock seconds or in block height,
/// never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ScryptoSbor)]
pub enum PoolEnd {
    /// Unix time (seconds) at which coverage ends.
    Time { end_time: u64 },

    /// Block height at which coverage ends.
    Height { end_block_height: u64 },
}

impl PoolEnd {
    /// Derive the end bound from a requested coverage length.
    ///
    /// Seconds take precedence over blocks. Returns `None` when neither is set.
    pub fn from_coverage(
        block_time: u64,
        block_height: u64,
        time_of_coverage: u64,
        blocks_of_coverage: u64,
    ) -> Option<Self> {
        if time_of_coverage != 0 {
            Some(PoolEnd::Time {
                end_time: block_time.saturating_add(time_of_coverage),
            })
        } else if blocks_of_coverage != 0 {
            Some(PoolEnd::Height {
                end_block_height: block_height.saturating_add(blocks_of_coverage),
            })
        } else {
            None
        }
    }

    /// End time in seconds, zero for height-based coverage.
    pub fn end_time(&self) -> u64 {
        match self {
            PoolEnd::Time { end_time } => *end_time,
            PoolEnd::Height { .. } => 0,
        }
    }

    /// End block height, zero for time-based coverage.
    pub fn end_block_height(&self) -> u64 {
        match self {
            PoolEnd::Time { .. } => 0,
            PoolEnd::Height { end_block_height } => *end_block_height,
        }
    }

    pub fn is_time_based(&self) -> bool {
        matches!(self, PoolEnd::Time { .. })
    }

    /// Whether both bounds have been exceeded.
    ///
    /// The unset bound reads as zero, so only the populated bound can hold
    /// expiry back.
    pub fn has_passed(&self, block_time: u64, block_height: u64) -> bool {
        block_time > self.end_time() && block_height > self.end_block_height()
    }
}

/// A coverage offering backed by provider collateral.
#[derive(Debug, Clone, PartialEq, Eq, ScryptoSbor)]
pub struct Pool {
    /// Sequentially assigned identifier.
    pub id: PoolId,

    /// Coverage sold.
    pub shield: Coins,

    /// Collateral committed to this pool.
    ///
    /// Always equals the sum of every provider's collateral `amount` for
    /// this pool.
    pub total_collateral: Coins,

    /// Accumulated premium.
    pub premium: MixedDecCoins,

    /// Beneficiary of the coverage.
    pub sponsor: String,

    /// Whether the pool accepts new purchases.
    pub active: bool,

    /// Block height at creation.
    pub start_block_height: u64,

    /// Coverage end bound.
    pub end: PoolEnd,
}

impl Pool {
    /// Create an active pool whose initial collateral is the full shield.
    pub fn new(
        id: PoolId,
        shield: Coins,
        premium: MixedDecCoins,
        sponsor: impl Into<String>,
        start_block_height: u64,
        end: PoolEnd,
    ) -> Self {
        Self {
            id,
            total_collateral: shield.clone(),
            shield,
            premium,
            sponsor: sponsor.into(),
            active: true,
            start_block_height,
            end,
        }
    }

    pub fn end_time(&self) -> u64 {
        self.end.end_time()
    }

    pub fn end_block_height(&self) -> u64 {
        self.end.end_block_height()
    }

    /// Whether coverage has ended at the given block.
    pub fn has_ended(&self, block_time: u64, block_height: u64) -> bool {
        self.end.has_passed(block_time, block_height)
    }
}
