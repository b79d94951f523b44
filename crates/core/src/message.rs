//! Inbound shield messages.

use shield_types::{Address, Coins, MixedCoins, PoolId};

/// A request to the shield core, one per transaction.
///
/// The message layer decodes these from transactions; the keeper's handler
/// applies each one atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShieldMsg {
    // ═══════════════════════════════════════════════════════════════════════
    // Pool lifecycle
    // ═══════════════════════════════════════════════════════════════════════
    /// Open a new coverage pool.
    CreatePool {
        creator: Address,
        shield: Coins,
        deposit: MixedCoins,
        sponsor: String,
        time_of_coverage: u64,
        blocks_of_coverage: u64,
    },

    /// Add shield, premium and duration to an existing pool.
    UpdatePool {
        updater: Address,
        pool_id: PoolId,
        shield: Coins,
        deposit: MixedCoins,
        additional_time: u64,
        additional_blocks: u64,
    },

    /// Stop a pool from accepting purchases.
    PausePool { updater: Address, pool_id: PoolId },

    /// Re-open a paused pool.
    ResumePool { updater: Address, pool_id: PoolId },

    // ═══════════════════════════════════════════════════════════════════════
    // Collateral
    // ═══════════════════════════════════════════════════════════════════════
    /// Release bonded collateral across every pool the provider backs.
    WithdrawFromPools { provider: Address, amount: Coins },
}

impl ShieldMsg {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ShieldMsg::CreatePool { .. } => "CreatePool",
            ShieldMsg::UpdatePool { .. } => "UpdatePool",
            ShieldMsg::PausePool { .. } => "PausePool",
            ShieldMsg::ResumePool { .. } => "ResumePool",
            ShieldMsg::WithdrawFromPools { .. } => "WithdrawFromPools",
        }
    }

    /// The account that signed the message.
    pub fn signer(&self) -> &Address {
        match self {
            ShieldMsg::CreatePool { creator, .. } => creator,
            ShieldMsg::UpdatePool { updater, .. }
            | ShieldMsg::PausePool { updater, .. }
            | ShieldMsg::ResumePool { updater, .. } => updater,
            ShieldMsg::WithdrawFromPools { provider, .. } => provider,
        }
    }

    /// Check if this is a pool lifecycle message.
    pub fn is_pool_lifecycle(&self) -> bool {
        matches!(
            self,
            ShieldMsg::CreatePool { .. }
                | ShieldMsg::UpdatePool { .. }
                | ShieldMsg::PausePool { .. }
                | ShieldMsg::ResumePool { .. }
        )
    }
}
