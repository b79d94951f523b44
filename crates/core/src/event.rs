//! Outbound shield events.

use shield_types::{Address, Coins, PoolId};

/// A state transition reported to the host after a successful operation.
///
/// Events are emitted in execution order and carry only data that every
/// replica derives identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShieldEvent {
    PoolCreated {
        pool_id: PoolId,
        shield: Coins,
        sponsor: String,
    },

    PoolUpdated {
        pool_id: PoolId,
        shield: Coins,
    },

    PoolPaused {
        pool_id: PoolId,
    },

    PoolResumed {
        pool_id: PoolId,
    },

    /// Coverage ended and every collateral was released.
    PoolClosed {
        pool_id: PoolId,
    },

    /// A collateral release was queued.
    WithdrawalQueued {
        pool_id: PoolId,
        provider: Address,
        amount: Coins,
        completion_time: u64,
    },

    /// A queued release matured and left the pool.
    WithdrawalCompleted {
        pool_id: PoolId,
        provider: Address,
        amount: Coins,
    },
}

impl ShieldEvent {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ShieldEvent::PoolCreated { .. } => "PoolCreated",
            ShieldEvent::PoolUpdated { .. } => "PoolUpdated",
            ShieldEvent::PoolPaused { .. } => "PoolPaused",
            ShieldEvent::PoolResumed { .. } => "PoolResumed",
            ShieldEvent::PoolClosed { .. } => "PoolClosed",
            ShieldEvent::WithdrawalQueued { .. } => "WithdrawalQueued",
            ShieldEvent::WithdrawalCompleted { .. } => "WithdrawalCompleted",
        }
    }

    /// Pool the event refers to.
    pub fn pool_id(&self) -> PoolId {
        match self {
            ShieldEvent::PoolCreated { pool_id, .. }
            | ShieldEvent::PoolUpdated { pool_id, .. }
            | ShieldEvent::PoolPaused { pool_id }
            | ShieldEvent::PoolResumed { pool_id }
            | ShieldEvent::PoolClosed { pool_id }
            | ShieldEvent::WithdrawalQueued { pool_id, .. }
            | ShieldEvent::WithdrawalCompleted { pool_id, .. } => *pool_id,
        }
    }
}
