//! Pool parameters supplied by the parameter store.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Average block interval assumed when a duration is given in blocks.
pub const AVERAGE_BLOCK_TIME_SECS: u64 = 5;

/// Pool lifetime and withdrawal parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolParams {
    /// Minimum coverage length. Requests must strictly exceed it.
    pub min_pool_life_secs: u64,

    /// Delay between starting a collateral release and settling it.
    pub withdraw_period_secs: u64,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            min_pool_life_secs: 24 * 60 * 60,
            withdraw_period_secs: 21 * 24 * 60 * 60,
        }
    }
}

impl PoolParams {
    /// Create params with a custom minimum pool life.
    pub fn with_min_pool_life(min_pool_life: Duration) -> Self {
        Self {
            min_pool_life_secs: min_pool_life.as_secs(),
            ..Default::default()
        }
    }

    pub fn min_pool_life(&self) -> Duration {
        Duration::from_secs(self.min_pool_life_secs)
    }

    pub fn withdraw_period(&self) -> Duration {
        Duration::from_secs(self.withdraw_period_secs)
    }
}
