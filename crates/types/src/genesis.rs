//! Genesis state for import and export.

use crate::{Address, Collateral, Pool, PoolId, Provider, Withdrawal};
use radix_common::ScryptoSbor;

/// Full snapshot of shield state.
#[derive(Debug, Clone, Default, PartialEq, Eq, ScryptoSbor)]
pub struct GenesisState {
    /// Administrator allowed to manage pools.
    pub admin: Option<Address>,

    /// Next id to assign.
    pub next_pool_id: PoolId,

    pub pools: Vec<Pool>,
    pub providers: Vec<Provider>,
    pub collaterals: Vec<Collateral>,

    /// Queued withdrawals in settlement order.
    pub withdrawals: Vec<Withdrawal>,
}

impl GenesisState {
    /// Genesis with only an administrator set.
    pub fn with_admin(admin: Address) -> Self {
        Self {
            admin: Some(admin),
            ..Default::default()
        }
    }
}
