//! Collateral ledger and the withdrawal queue.
//!
//! A provider's commitment to a pool is a [`Collateral`] record. Releasing
//! part of it is two-phase: [`Keeper::withdraw_collateral`] marks the amount
//! as withdrawing and queues a [`Withdrawal`]; once the withdraw period has
//! passed, [`Keeper::complete_withdrawals`] takes it out of the collateral,
//! the pool and the provider.

use crate::{Keeper, ShieldError};
use shield_core::BlockContext;
use shield_store::{keys, KvStore};
use shield_types::{Address, Coins, CoinsError, Collateral, PoolId, Withdrawal};
use tracing::{debug, info, warn};

impl Keeper {
    pub fn get_collateral(
        &self,
        store: &dyn KvStore,
        pool_id: PoolId,
        provider: &Address,
    ) -> Result<Option<Collateral>, ShieldError> {
        Ok(keys::COLLATERALS.may_load(store, &(pool_id, provider.clone()))?)
    }

    pub fn set_collateral(
        &self,
        store: &mut dyn KvStore,
        collateral: &Collateral,
    ) -> Result<(), ShieldError> {
        let key = (collateral.pool_id, collateral.provider.clone());
        keys::COLLATERALS.save(store, &key, collateral)?;
        Ok(())
    }

    /// Every collateral backing `pool_id`, in provider key order.
    pub fn get_pool_collaterals(
        &self,
        store: &dyn KvStore,
        pool_id: PoolId,
    ) -> Result<Vec<Collateral>, ShieldError> {
        Ok(keys::COLLATERALS
            .prefixed(store, &pool_id)?
            .into_iter()
            .map(|(_, collateral)| collateral)
            .collect())
    }

    /// Every collateral held by `provider`, in pool id order.
    pub fn get_provider_collaterals(
        &self,
        store: &dyn KvStore,
        provider: &Address,
    ) -> Result<Vec<Collateral>, ShieldError> {
        Ok(keys::COLLATERALS
            .entries(store)?
            .into_iter()
            .filter(|((_, address), _)| address == provider)
            .map(|(_, collateral)| collateral)
            .collect())
    }

    pub fn get_all_collaterals(&self, store: &dyn KvStore) -> Result<Vec<Collateral>, ShieldError> {
        Ok(keys::COLLATERALS
            .entries(store)?
            .into_iter()
            .map(|(_, collateral)| collateral)
            .collect())
    }

    /// Queued withdrawals in maturity order.
    pub fn get_withdrawals(&self, store: &dyn KvStore) -> Result<Vec<Withdrawal>, ShieldError> {
        Ok(keys::WITHDRAW_QUEUE
            .entries(store)?
            .into_iter()
            .map(|(_, withdrawal)| withdrawal)
            .collect())
    }

    /// Start releasing `amount` of `provider`'s collateral in `pool_id`.
    ///
    /// Validates before writing anything, so a failure leaves the store as
    /// it was.
    pub fn withdraw_collateral(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
        provider: &Address,
        pool_id: PoolId,
        amount: &Coins,
    ) -> Result<Withdrawal, ShieldError> {
        if amount.is_zero() {
            return Err(ShieldError::ZeroAmount);
        }
        let bond_denom = self.bond_denom();

        let mut collateral = self.get_collateral(store, pool_id, provider)?.ok_or_else(|| {
            ShieldError::NoCollateralFound {
                pool_id,
                provider: provider.clone(),
            }
        })?;
        for (denom, requested) in amount.iter() {
            let free = collateral
                .amount
                .amount_of(denom)
                .saturating_sub(collateral.withdrawing.amount_of(denom));
            if requested > free {
                return Err(ShieldError::InsufficientCollateral {
                    address: provider.clone(),
                    denom: denom.to_string(),
                    withdrawable: free,
                    requested,
                });
            }
        }

        let mut record = self.load_provider(store, provider)?;
        let requested = amount.amount_of(&bond_denom);
        let withdrawable = record.withdrawable(&bond_denom);
        if requested > withdrawable {
            return Err(ShieldError::InsufficientCollateral {
                address: provider.clone(),
                denom: bond_denom,
                withdrawable,
                requested,
            });
        }

        collateral.withdrawing = collateral.withdrawing.checked_add(amount)?;
        record.withdraw += requested;

        let completion_time = ctx
            .block_time
            .saturating_add(self.pool_params().withdraw_period_secs);
        let withdrawal = Withdrawal {
            pool_id,
            provider: provider.clone(),
            amount: amount.clone(),
            completion_time,
        };

        self.set_collateral(store, &collateral)?;
        self.set_provider(store, &record)?;
        self.enqueue_withdrawal(store, &withdrawal)?;

        info!(
            pool_id = %pool_id,
            provider = %provider,
            amount = %amount,
            completion_time,
            "Collateral withdrawal queued"
        );
        Ok(withdrawal)
    }

    /// Settle every queued withdrawal due at or before the block time.
    ///
    /// Returns the settled withdrawals in maturity order.
    pub fn complete_withdrawals(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
    ) -> Result<Vec<Withdrawal>, ShieldError> {
        let bond_denom = self.bond_denom();
        let matured: Vec<_> = keys::WITHDRAW_QUEUE
            .entries(store)?
            .into_iter()
            .take_while(|((completion_time, _), _)| *completion_time <= ctx.block_time)
            .collect();

        let mut completed = Vec::with_capacity(matured.len());
        for (key, withdrawal) in matured {
            keys::WITHDRAW_QUEUE.remove(store, &key)?;
            self.settle_withdrawal(store, &withdrawal, &bond_denom)?;
            info!(
                pool_id = %withdrawal.pool_id,
                provider = %withdrawal.provider,
                amount = %withdrawal.amount,
                "Collateral withdrawal completed"
            );
            completed.push(withdrawal);
        }
        Ok(completed)
    }

    /// Release every collateral of a closing pool back to its provider.
    ///
    /// Amounts still withdrawing are dropped from the provider's pending
    /// withdraw instead of returning to `available`, and their queue entries
    /// are deleted.
    pub fn free_collaterals(
        &self,
        store: &mut dyn KvStore,
        pool_id: PoolId,
    ) -> Result<(), ShieldError> {
        let bond_denom = self.bond_denom();

        for (key, collateral) in keys::COLLATERALS.prefixed(store, &pool_id)? {
            let mut provider = self.load_provider(store, &collateral.provider)?;
            let withdrawing = collateral.withdrawing.amount_of(&bond_denom);
            let released = collateral
                .amount
                .amount_of(&bond_denom)
                .saturating_sub(withdrawing);

            provider.collateral = provider.collateral.checked_sub(&collateral.amount)?;
            provider.withdraw = provider.withdraw.saturating_sub(withdrawing);
            provider.available =
                provider
                    .available
                    .checked_add(released)
                    .ok_or_else(|| CoinsError::Overflow {
                        denom: bond_denom.clone(),
                    })?;

            self.set_provider(store, &provider)?;
            keys::COLLATERALS.remove(store, &key)?;
            debug!(
                pool_id = %pool_id,
                provider = %collateral.provider,
                released,
                "Collateral freed"
            );
        }

        for (key, withdrawal) in keys::WITHDRAW_QUEUE.entries(store)? {
            if withdrawal.pool_id == pool_id {
                keys::WITHDRAW_QUEUE.remove(store, &key)?;
            }
        }
        Ok(())
    }

    fn enqueue_withdrawal(
        &self,
        store: &mut dyn KvStore,
        withdrawal: &Withdrawal,
    ) -> Result<(), ShieldError> {
        let sequence = keys::WITHDRAW_SEQUENCE.may_load(store)?.unwrap_or(0);
        keys::WITHDRAW_QUEUE.save(store, &(withdrawal.completion_time, sequence), withdrawal)?;
        keys::WITHDRAW_SEQUENCE.save(store, &(sequence + 1))?;
        Ok(())
    }

    fn settle_withdrawal(
        &self,
        store: &mut dyn KvStore,
        withdrawal: &Withdrawal,
        bond_denom: &str,
    ) -> Result<(), ShieldError> {
        let pool_id = withdrawal.pool_id;
        let Some(mut collateral) = self.get_collateral(store, pool_id, &withdrawal.provider)?
        else {
            warn!(
                pool_id = %pool_id,
                provider = %withdrawal.provider,
                "Matured withdrawal has no collateral, dropping"
            );
            return Ok(());
        };

        collateral.amount = collateral.amount.checked_sub(&withdrawal.amount)?;
        collateral.withdrawing = collateral.withdrawing.checked_sub(&withdrawal.amount)?;
        if collateral.amount.is_zero() {
            keys::COLLATERALS.remove(store, &(pool_id, withdrawal.provider.clone()))?;
        } else {
            self.set_collateral(store, &collateral)?;
        }

        let mut pool = self.load_pool(store, pool_id)?;
        pool.total_collateral = pool.total_collateral.checked_sub(&withdrawal.amount)?;
        self.set_pool(store, &pool)?;

        let mut provider = self.load_provider(store, &withdrawal.provider)?;
        let bonded = withdrawal.amount.amount_of(bond_denom);
        provider.collateral = provider.collateral.checked_sub(&withdrawal.amount)?;
        provider.withdraw =
            provider
                .withdraw
                .checked_sub(bonded)
                .ok_or_else(|| CoinsError::Insufficient {
                    denom: bond_denom.to_string(),
                    available: provider.withdraw,
                    requested: bonded,
                })?;
        self.set_provider(store, &provider)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::keeper::testing::Harness;
    use crate::ShieldError;
    use shield_test_helpers::{admin, bond, test_address, TEST_WITHDRAW_PERIOD_SECS};
    use shield_types::PoolId;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_withdraw_collateral_queues_release() {
        let mut h = Harness::new();
        let pool = h.create_pool(1_000);

        let withdrawal = h
            .keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(400))
            .unwrap();
        assert_eq!(
            withdrawal.completion_time,
            h.ctx.block_time + TEST_WITHDRAW_PERIOD_SECS
        );

        let collateral = h
            .keeper
            .get_collateral(&h.store, pool.id, &admin())
            .unwrap()
            .unwrap();
        assert_eq!(collateral.amount, bond(1_000));
        assert_eq!(collateral.withdrawing, bond(400));

        let provider = h.keeper.get_provider(&h.store, &admin()).unwrap().unwrap();
        assert_eq!(provider.withdraw, 400);
        assert_eq!(h.keeper.get_withdrawals(&h.store).unwrap(), vec![withdrawal]);
    }

    #[traced_test]
    #[test]
    fn test_withdraw_more_than_free_collateral_fails() {
        let mut h = Harness::new();
        let pool = h.create_pool(100);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(80))
            .unwrap();

        let err = h
            .keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(21))
            .unwrap_err();
        assert!(matches!(
            err,
            ShieldError::InsufficientCollateral {
                withdrawable: 20,
                requested: 21,
                ..
            }
        ));
    }

    #[traced_test]
    #[test]
    fn test_withdraw_without_collateral() {
        let mut h = Harness::new();
        let err = h
            .keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &test_address("x"), PoolId(9), &bond(1))
            .unwrap_err();
        assert!(matches!(err, ShieldError::NoCollateralFound { .. }));
    }

    #[traced_test]
    #[test]
    fn test_complete_withdrawals_waits_for_maturity() {
        let mut h = Harness::new();
        let pool = h.create_pool(1_000);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(250))
            .unwrap();

        h.advance(TEST_WITHDRAW_PERIOD_SECS - 1);
        assert!(h
            .keeper
            .complete_withdrawals(&mut h.store, &h.ctx)
            .unwrap()
            .is_empty());

        h.advance(1);
        let completed = h.keeper.complete_withdrawals(&mut h.store, &h.ctx).unwrap();
        assert_eq!(completed.len(), 1);

        let pool = h.keeper.get_pool(&h.store, pool.id).unwrap().unwrap();
        assert_eq!(pool.total_collateral, bond(750));
        let collateral = h
            .keeper
            .get_collateral(&h.store, pool.id, &admin())
            .unwrap()
            .unwrap();
        assert_eq!(collateral.amount, bond(750));
        assert!(collateral.withdrawing.is_zero());
        let provider = h.keeper.get_provider(&h.store, &admin()).unwrap().unwrap();
        assert_eq!(provider.collateral, bond(750));
        assert_eq!(provider.withdraw, 0);
        assert!(h.keeper.get_withdrawals(&h.store).unwrap().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_fully_withdrawn_collateral_is_deleted() {
        let mut h = Harness::new();
        let pool = h.create_pool(500);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(500))
            .unwrap();
        h.advance(TEST_WITHDRAW_PERIOD_SECS);
        h.keeper.complete_withdrawals(&mut h.store, &h.ctx).unwrap();

        assert_eq!(
            h.keeper.get_collateral(&h.store, pool.id, &admin()).unwrap(),
            None
        );
        let pool = h.keeper.get_pool(&h.store, pool.id).unwrap().unwrap();
        assert!(pool.total_collateral.is_zero());
    }

    #[traced_test]
    #[test]
    fn test_free_collaterals_returns_stake() {
        let mut h = Harness::new();
        let pool = h.create_pool(1_000);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(300))
            .unwrap();
        let before = h.keeper.get_provider(&h.store, &admin()).unwrap().unwrap();

        h.keeper.free_collaterals(&mut h.store, pool.id).unwrap();

        let after = h.keeper.get_provider(&h.store, &admin()).unwrap().unwrap();
        assert!(after.collateral.is_zero());
        assert_eq!(after.withdraw, 0);
        assert_eq!(after.available, before.available + 700);
        assert!(h.keeper.get_pool_collaterals(&h.store, pool.id).unwrap().is_empty());
        assert!(h.keeper.get_withdrawals(&h.store).unwrap().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_provider_collaterals_in_pool_order() {
        let mut h = Harness::new();
        let first = h.create_pool(10);
        let second = h.create_pool(20);

        let pools: Vec<_> = h
            .keeper
            .get_provider_collaterals(&h.store, &admin())
            .unwrap()
            .into_iter()
            .map(|c| c.pool_id)
            .collect();
        assert_eq!(pools, vec![first.id, second.id]);
        assert_eq!(h.keeper.get_all_collaterals(&h.store).unwrap().len(), 2);
    }
}
