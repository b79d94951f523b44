//! Interfaces to the collaborators that surround the shield core.
//!
//! The host chain supplies implementations of these traits. None of them may
//! consult wall-clock time, randomness or unordered state: the keeper relies
//! on every replica observing the same answers for the same block.

use shield_types::{Address, Coins, PoolParams};
use thiserror::Error;

/// The staking subsystem.
pub trait StakingKeeper: Send + Sync {
    /// Canonical bonding denomination.
    fn bond_denom(&self) -> String;

    /// Total bonded balance of `address`, in the bonding denomination.
    fn bonded_balance(&self, address: &Address) -> u128;
}

/// The parameter store.
pub trait ParamSource: Send + Sync {
    /// Current pool parameters.
    fn pool_params(&self) -> PoolParams;
}

/// Failure reported by the premium sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Premium deposit of {amount} from {payer} failed: {reason}")]
pub struct PremiumError {
    pub payer: Address,
    pub amount: Coins,
    pub reason: String,
}

/// Moves deposited premium out of the payer's account.
pub trait PremiumSink: Send + Sync {
    /// Transfer the native part of a deposit from `payer`.
    ///
    /// Called before any derived state is persisted; an error aborts the
    /// enclosing operation.
    fn deposit_native_premium(&self, amount: &Coins, payer: &Address) -> Result<(), PremiumError>;
}
