//! Configuration for the shield keeper.

use serde::{Deserialize, Serialize};

/// What a multi-pool withdrawal does when one pool's release fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawFailurePolicy {
    /// Record the failure in the report and carry on with the next pool.
    #[default]
    Skip,

    /// Fail the whole withdrawal so the transaction rolls back.
    Abort,
}

/// Keeper behaviour that is fixed per deployment rather than governed by
/// on-chain parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    /// Handling of per-pool failures during `withdraw_from_pools`.
    pub withdraw_failure_policy: WithdrawFailurePolicy,

    /// Maximum number of ended pools closed in one end-block.
    ///
    /// Pools beyond the limit stay open until a later block. `None` closes
    /// every ended pool.
    pub max_pools_closed_per_block: Option<usize>,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            withdraw_failure_policy: WithdrawFailurePolicy::Skip,
            max_pools_closed_per_block: None,
        }
    }
}

impl ShieldConfig {
    /// Create a config with a custom withdrawal failure policy.
    pub fn with_failure_policy(withdraw_failure_policy: WithdrawFailurePolicy) -> Self {
        Self {
            withdraw_failure_policy,
            ..Default::default()
        }
    }

    /// Create a config that closes at most `max` pools per end-block.
    pub fn with_max_pools_closed_per_block(max: usize) -> Self {
        Self {
            max_pools_closed_per_block: Some(max),
            ..Default::default()
        }
    }
}
