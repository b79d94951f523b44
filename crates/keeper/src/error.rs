//! Error types for keeper operations.

use shield_core::PremiumError;
use shield_store::StoreError;
use shield_types::{Address, CoinsError, DecimalError, PoolId};
use thiserror::Error;

/// Broad category of a [`ShieldError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller is not allowed to perform the operation.
    Authorization,
    /// Request is malformed or exceeds what state allows.
    Validation,
    /// A referenced record does not exist.
    NotFound,
    /// Record is already in the requested state.
    StateConflict,
    /// The premium sink rejected a transfer.
    TransferFailure,
    /// Store or arithmetic failure.
    Internal,
}

/// Errors returned by the keeper.
///
/// Every error is recoverable: the handler discards the transaction's writes
/// and hands the error back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShieldError {
    #[error("{address} is not the shield administrator")]
    NotAdmin { address: Address },

    #[error(
        "Pool life too short: {seconds}s or {blocks} blocks does not exceed the minimum of {min_secs}s"
    )]
    PoolLifeTooShort {
        seconds: u64,
        blocks: u64,
        min_secs: u64,
    },

    #[error("Insufficient staking: {address} has {available}{denom} available, needs {requested}{denom}")]
    InsufficientStaking {
        address: Address,
        denom: String,
        available: u128,
        requested: u128,
    },

    #[error("Insufficient collateral: {address} can withdraw {withdrawable}{denom}, requested {requested}{denom}")]
    InsufficientCollateral {
        address: Address,
        denom: String,
        withdrawable: u128,
        requested: u128,
    },

    /// An update tried to extend the bound the pool does not use.
    ///
    /// The whole update is refused, including its shield and premium.
    #[error("{pool_id} coverage is {actual}-based and cannot be extended by {requested}")]
    CoverageKindMismatch {
        pool_id: PoolId,
        actual: &'static str,
        requested: &'static str,
    },

    #[error("Withdrawal for {address} released {withdrawn} of {requested} before {pool_id} failed: {reason}")]
    PartialWithdrawal {
        address: Address,
        requested: u128,
        withdrawn: u128,
        pool_id: PoolId,
        reason: String,
    },

    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("{0} not found")]
    NoPoolFound(PoolId),

    #[error("No delegation found for {0}")]
    NoDelegation(Address),

    #[error("No collateral found for {provider} in {pool_id}")]
    NoCollateralFound { pool_id: PoolId, provider: Address },

    #[error("No shield administrator configured")]
    NoAdmin,

    #[error("{0} is already paused")]
    PoolAlreadyPaused(PoolId),

    #[error("{0} is already active")]
    PoolAlreadyActive(PoolId),

    #[error("Premium transfer failed: {0}")]
    PremiumTransfer(#[from] PremiumError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] CoinsError),
}

impl From<DecimalError> for ShieldError {
    fn from(err: DecimalError) -> Self {
        ShieldError::Arithmetic(CoinsError::Decimal(err))
    }
}

impl ShieldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShieldError::NotAdmin { .. } => ErrorKind::Authorization,
            ShieldError::PoolLifeTooShort { .. }
            | ShieldError::InsufficientStaking { .. }
            | ShieldError::InsufficientCollateral { .. }
            | ShieldError::CoverageKindMismatch { .. }
            | ShieldError::PartialWithdrawal { .. }
            | ShieldError::ZeroAmount
            | ShieldError::InvalidGenesis(_) => ErrorKind::Validation,
            ShieldError::NoPoolFound(_)
            | ShieldError::NoDelegation(_)
            | ShieldError::NoCollateralFound { .. }
            | ShieldError::NoAdmin => ErrorKind::NotFound,
            ShieldError::PoolAlreadyPaused(_) | ShieldError::PoolAlreadyActive(_) => {
                ErrorKind::StateConflict
            }
            ShieldError::PremiumTransfer(_) => ErrorKind::TransferFailure,
            ShieldError::Store(_) | ShieldError::Arithmetic(_) => ErrorKind::Internal,
        }
    }
}
