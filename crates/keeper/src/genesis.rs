//! Genesis import and export.

use crate::{Keeper, ShieldError};
use shield_store::{keys, KvStore, OverlayStore};
use shield_types::{Coins, GenesisState, PoolId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

impl Keeper {
    /// Load a genesis snapshot into an empty store.
    ///
    /// The snapshot is loaded into an overlay and must pass
    /// [`Keeper::check_invariants`] there before anything reaches `store`.
    pub fn init_genesis(
        &self,
        store: &mut dyn KvStore,
        genesis: &GenesisState,
    ) -> Result<(), ShieldError> {
        validate_genesis(genesis)?;

        let mut overlay = OverlayStore::new(store);
        self.write_genesis(&mut overlay, genesis)?;
        let violations = self.check_invariants(&overlay)?;
        if !violations.is_empty() {
            overlay.discard();
            warn!(violations = violations.len(), "Rejected inconsistent genesis");
            return Err(ShieldError::InvalidGenesis(
                violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ));
        }
        overlay.commit();

        info!(
            admin = ?genesis.admin,
            next_pool_id = %genesis.next_pool_id,
            pools = genesis.pools.len(),
            providers = genesis.providers.len(),
            collaterals = genesis.collaterals.len(),
            withdrawals = genesis.withdrawals.len(),
            "Shield genesis loaded"
        );
        Ok(())
    }

    fn write_genesis(
        &self,
        store: &mut dyn KvStore,
        genesis: &GenesisState,
    ) -> Result<(), ShieldError> {
        if let Some(admin) = &genesis.admin {
            keys::ADMIN.save(store, admin)?;
        }
        self.set_next_pool_id(store, genesis.next_pool_id)?;
        for pool in &genesis.pools {
            self.set_pool(store, pool)?;
        }
        for provider in &genesis.providers {
            self.set_provider(store, provider)?;
        }
        for collateral in &genesis.collaterals {
            self.set_collateral(store, collateral)?;
        }
        for (sequence, withdrawal) in genesis.withdrawals.iter().enumerate() {
            let key = (withdrawal.completion_time, sequence as u64);
            keys::WITHDRAW_QUEUE.save(store, &key, withdrawal)?;
        }
        keys::WITHDRAW_SEQUENCE.save(store, &(genesis.withdrawals.len() as u64))?;
        Ok(())
    }

    /// Dump all shield state in key order.
    pub fn export_genesis(&self, store: &dyn KvStore) -> Result<GenesisState, ShieldError> {
        Ok(GenesisState {
            admin: keys::ADMIN.may_load(store)?,
            next_pool_id: self.get_next_pool_id(store)?,
            pools: self.get_all_pools(store)?,
            providers: self.get_all_providers(store)?,
            collaterals: self.get_all_collaterals(store)?,
            withdrawals: self.get_withdrawals(store)?,
        })
    }
}

fn validate_genesis(genesis: &GenesisState) -> Result<(), ShieldError> {
    let invalid = |msg: String| Err(ShieldError::InvalidGenesis(msg));

    let mut pool_ids = BTreeSet::new();
    for pool in &genesis.pools {
        if pool.id >= genesis.next_pool_id {
            return invalid(format!(
                "{} is not below next pool id {}",
                pool.id, genesis.next_pool_id
            ));
        }
        if !pool_ids.insert(pool.id) {
            return invalid(format!("duplicate {}", pool.id));
        }
    }

    let providers: BTreeSet<_> = genesis.providers.iter().map(|p| &p.address).collect();
    let mut sums: BTreeMap<PoolId, Coins> = BTreeMap::new();
    for collateral in &genesis.collaterals {
        if !pool_ids.contains(&collateral.pool_id) {
            return invalid(format!(
                "collateral of {} references unknown {}",
                collateral.provider, collateral.pool_id
            ));
        }
        if !providers.contains(&collateral.provider) {
            return invalid(format!("collateral references unknown provider {}", collateral.provider));
        }
        if !collateral.amount.is_all_gte(&collateral.withdrawing) {
            return invalid(format!(
                "{} in {} is withdrawing more than it holds",
                collateral.provider, collateral.pool_id
            ));
        }
        let sum = sums.entry(collateral.pool_id).or_default();
        *sum = sum.checked_add(&collateral.amount)?;
    }

    for pool in &genesis.pools {
        let summed = sums.remove(&pool.id).unwrap_or_default();
        if summed != pool.total_collateral {
            return invalid(format!(
                "{} total collateral {} differs from collateral sum {}",
                pool.id, pool.total_collateral, summed
            ));
        }
    }

    for withdrawal in &genesis.withdrawals {
        if !pool_ids.contains(&withdrawal.pool_id) {
            return invalid(format!("withdrawal references unknown {}", withdrawal.pool_id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::keeper::testing::Harness;
    use crate::ShieldError;
    use shield_store::MemStore;
    use shield_test_helpers::{admin, bond};
    use shield_types::{GenesisState, PoolId, Withdrawal};
    use tracing_test::traced_test;

    fn populated() -> (Harness, GenesisState) {
        let mut h = Harness::new();
        let pool = h.create_pool(300);
        h.create_pool(200);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(50))
            .unwrap();
        let genesis = h.keeper.export_genesis(&h.store).unwrap();
        (h, genesis)
    }

    #[traced_test]
    #[test]
    fn test_export_import_round_trip() {
        let (h, genesis) = populated();
        assert_eq!(genesis.admin, Some(admin()));
        assert_eq!(genesis.next_pool_id, PoolId(3));
        assert_eq!(genesis.pools.len(), 2);
        assert_eq!(genesis.withdrawals.len(), 1);

        let mut fresh = MemStore::new();
        h.keeper.init_genesis(&mut fresh, &genesis).unwrap();
        assert_eq!(h.keeper.export_genesis(&fresh).unwrap(), genesis);
        assert!(h.keeper.check_invariants(&fresh).unwrap().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_rejects_inconsistent_totals() {
        let (h, mut genesis) = populated();
        genesis.pools[0].total_collateral = bond(1);

        let mut fresh = MemStore::new();
        let err = h.keeper.init_genesis(&mut fresh, &genesis).unwrap_err();
        assert!(matches!(err, ShieldError::InvalidGenesis(_)));
        assert!(fresh.is_empty());
    }

    #[traced_test]
    #[test]
    fn test_rejects_pool_ids_at_or_above_counter() {
        let (h, mut genesis) = populated();
        genesis.next_pool_id = PoolId(2);

        let err = h
            .keeper
            .init_genesis(&mut MemStore::new(), &genesis)
            .unwrap_err();
        assert!(matches!(err, ShieldError::InvalidGenesis(_)));
    }

    #[traced_test]
    #[test]
    fn test_rejects_withdrawal_missing_from_provider() {
        let mut h = Harness::new();
        let pool = h.create_pool(300);
        let mut genesis = h.keeper.export_genesis(&h.store).unwrap();
        genesis.withdrawals.push(Withdrawal {
            pool_id: pool.id,
            provider: admin(),
            amount: bond(5),
            completion_time: h.ctx.block_time,
        });

        let mut fresh = MemStore::new();
        let err = h.keeper.init_genesis(&mut fresh, &genesis).unwrap_err();
        let ShieldError::InvalidGenesis(reason) = &err else {
            panic!("expected InvalidGenesis, got {err:?}");
        };
        assert!(reason.contains("pending withdraw"), "{reason}");
        assert!(fresh.is_empty());
    }

    #[traced_test]
    #[test]
    fn test_rejects_withdrawing_out_of_step_with_queue() {
        let (h, mut genesis) = populated();
        genesis.collaterals[0].withdrawing = bond(20);

        let mut fresh = MemStore::new();
        let err = h.keeper.init_genesis(&mut fresh, &genesis).unwrap_err();
        assert!(matches!(err, ShieldError::InvalidGenesis(_)));
        assert!(fresh.is_empty());
    }
}
