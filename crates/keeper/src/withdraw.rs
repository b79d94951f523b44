//! Withdrawing a provider's collateral across every pool it backs.

use crate::{Apportioner, Keeper, ShieldError, WithdrawFailurePolicy};
use shield_core::BlockContext;
use shield_store::KvStore;
use shield_types::{Address, Coins, PoolId, Withdrawal};
use tracing::{debug, info, warn};

/// A pool whose share could not be withdrawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawFailure {
    pub pool_id: PoolId,
    pub share: u128,
    pub error: ShieldError,
}

/// Outcome of [`Keeper::withdraw_from_pools`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalReport {
    pub provider: Address,

    /// Bond-denomination amount asked for.
    pub requested: u128,

    /// Bond-denomination amount actually queued.
    pub withdrawn: u128,

    /// One entry per pool that released a share, in pool id order.
    pub queued: Vec<Withdrawal>,

    /// Pools that were skipped.
    pub failures: Vec<WithdrawFailure>,
}

impl WithdrawalReport {
    fn new(provider: Address, requested: u128) -> Self {
        Self {
            provider,
            requested,
            withdrawn: 0,
            queued: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Requested amount that was not queued.
    pub fn shortfall(&self) -> u128 {
        self.requested.saturating_sub(self.withdrawn)
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }
}

impl Keeper {
    /// Withdraw `amount` of bonded collateral from every pool `address` backs,
    /// in proportion to what each pool holds.
    ///
    /// Rejects requests above the provider's withdrawable total without
    /// touching state. Per-pool failures are handled according to
    /// [`ShieldConfig::withdraw_failure_policy`](crate::ShieldConfig).
    pub fn withdraw_from_pools(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
        address: &Address,
        amount: &Coins,
    ) -> Result<WithdrawalReport, ShieldError> {
        let bond_denom = self.bond_denom();
        let requested = amount.amount_of(&bond_denom);

        let provider = self.load_provider(store, address)?;
        let withdrawable = provider.withdrawable(&bond_denom);
        if requested > withdrawable {
            return Err(ShieldError::InsufficientCollateral {
                address: address.clone(),
                denom: bond_denom,
                withdrawable,
                requested,
            });
        }

        let mut report = WithdrawalReport::new(address.clone(), requested);
        if requested == 0 {
            debug!(provider = %address, "Nothing to withdraw");
            return Ok(report);
        }

        let mut apportioner = Apportioner::new(requested, withdrawable)?;
        let collaterals = self.get_provider_collaterals(store, address)?;
        let last = collaterals.len().saturating_sub(1);

        for (i, collateral) in collaterals.iter().enumerate() {
            let share = apportioner.share(collateral.withdrawable(&bond_denom), i == last)?;
            if share == 0 {
                debug!(pool_id = %collateral.pool_id, "Zero share, skipping pool");
                continue;
            }

            let coins = Coins::single(&bond_denom, share);
            match self.withdraw_collateral(store, ctx, address, collateral.pool_id, &coins) {
                Ok(withdrawal) => {
                    debug!(pool_id = %collateral.pool_id, share, "Pool share withdrawn");
                    apportioner.record(share);
                    report.withdrawn += share;
                    report.queued.push(withdrawal);
                }
                Err(error) => match self.config().withdraw_failure_policy {
                    WithdrawFailurePolicy::Skip => {
                        warn!(
                            pool_id = %collateral.pool_id,
                            share,
                            error = %error,
                            "Pool share withdrawal failed, skipping"
                        );
                        report.failures.push(WithdrawFailure {
                            pool_id: collateral.pool_id,
                            share,
                            error,
                        });
                    }
                    WithdrawFailurePolicy::Abort => {
                        return Err(ShieldError::PartialWithdrawal {
                            address: address.clone(),
                            requested,
                            withdrawn: report.withdrawn,
                            pool_id: collateral.pool_id,
                            reason: error.to_string(),
                        });
                    }
                },
            }
        }

        if report.is_complete() {
            info!(
                provider = %address,
                withdrawn = report.withdrawn,
                pools = report.queued.len(),
                "Withdrawal from pools queued"
            );
        } else {
            warn!(
                provider = %address,
                requested,
                withdrawn = report.withdrawn,
                failures = report.failures.len(),
                "Withdrawal from pools fell short"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::testing::Harness;
    use crate::ShieldConfig;
    use shield_store::state_digest;
    use shield_test_helpers::{admin, bond, test_address, TEST_MIN_POOL_LIFE_SECS};
    use shield_types::{Decimal, MixedCoins};
    use tracing_test::traced_test;

    fn amounts(report: &WithdrawalReport) -> Vec<(PoolId, u128)> {
        report
            .queued
            .iter()
            .map(|w| (w.pool_id, w.amount.amount_of("ustake")))
            .collect()
    }

    #[traced_test]
    #[test]
    fn test_withdraw_apportions_exactly() {
        let mut h = Harness::new();
        let first = h.create_pool(100);
        let second = h.create_pool(50);

        let report = h
            .keeper
            .withdraw_from_pools(&mut h.store, &h.ctx, &admin(), &bond(90))
            .unwrap();

        assert_eq!(amounts(&report), vec![(first.id, 61), (second.id, 29)]);
        assert_eq!(report.withdrawn, 90);
        assert!(report.is_complete());
        assert!(report.failures.is_empty());

        let provider = h.keeper.get_provider(&h.store, &admin()).unwrap().unwrap();
        assert_eq!(provider.withdraw, 90);
    }

    #[traced_test]
    #[test]
    fn test_withdraw_eighteen_decimal_amounts() {
        let token = 1_000_000_000_000_000_000u128;
        let mut h = Harness::new();
        h.staking.set_balance(&admin(), 1_000_000 * token);

        let pool_id = h
            .keeper
            .create_pool(
                &mut h.store,
                &h.ctx,
                &admin(),
                &bond(300 * token),
                &MixedCoins::native(bond(300 * token)),
                "sponsor",
                TEST_MIN_POOL_LIFE_SECS + 1,
                0,
            )
            .unwrap()
            .id;
        let second = h.create_pool(150 * token);

        let report = h
            .keeper
            .withdraw_from_pools(&mut h.store, &h.ctx, &admin(), &bond(10))
            .unwrap();
        assert_eq!(report.withdrawn, 10);
        // The proportion rounds to zero at 18 decimals, so the first pool
        // gives the compensating unit and the last takes the rest.
        assert_eq!(amounts(&report), vec![(pool_id, 1), (second.id, 9)]);

        let pool = h.keeper.get_pool(&h.store, pool_id).unwrap().unwrap();
        assert_eq!(pool.premium.native.amount_of("ustake"), Decimal::from(300 * token));
    }

    #[traced_test]
    #[test]
    fn test_over_withdrawal_rejected() {
        let mut h = Harness::new();
        h.create_pool(100);
        h.create_pool(50);
        let before = state_digest(&h.store);

        let err = h
            .keeper
            .withdraw_from_pools(&mut h.store, &h.ctx, &admin(), &bond(151))
            .unwrap_err();
        assert_eq!(
            err,
            ShieldError::InsufficientCollateral {
                address: admin(),
                denom: "ustake".to_string(),
                withdrawable: 150,
                requested: 151,
            }
        );
        assert_eq!(state_digest(&h.store), before);
    }

    #[traced_test]
    #[test]
    fn test_unknown_provider() {
        let mut h = Harness::new();
        let err = h
            .keeper
            .withdraw_from_pools(&mut h.store, &h.ctx, &test_address("nobody"), &bond(1))
            .unwrap_err();
        assert_eq!(err, ShieldError::NoDelegation(test_address("nobody")));
    }

    #[traced_test]
    #[test]
    fn test_accounts_for_pending_withdrawals() {
        let mut h = Harness::new();
        let first = h.create_pool(100);
        let second = h.create_pool(100);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), first.id, &bond(100))
            .unwrap();

        // Only the second pool has anything left to give.
        let report = h
            .keeper
            .withdraw_from_pools(&mut h.store, &h.ctx, &admin(), &bond(40))
            .unwrap();
        assert_eq!(amounts(&report), vec![(second.id, 40)]);
    }

    /// Leaves 10 withdrawable in the first pool and 40 in the second.
    fn uneven_setup(h: &mut Harness) -> (PoolId, PoolId) {
        let first = h.create_pool(10);
        let second = h.create_pool(100);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), second.id, &bond(60))
            .unwrap();
        (first.id, second.id)
    }

    #[traced_test]
    #[test]
    fn test_repeat_withdrawals_drain_pools() {
        let mut h = Harness::new();
        let (first, _) = uneven_setup(&mut h);

        // 10 * 0.9 = 9, bumped to 10. The last pool is asked for 35 and has 40.
        let report = h
            .keeper
            .withdraw_from_pools(&mut h.store, &h.ctx, &admin(), &bond(45))
            .unwrap();
        assert_eq!(report.withdrawn, 45);
        assert_eq!(amounts(&report)[0], (first, 10));

        // A second request for the rest: first pool is empty, so its share is
        // zero and the last pool covers everything.
        let report = h
            .keeper
            .withdraw_from_pools(&mut h.store, &h.ctx, &admin(), &bond(5))
            .unwrap();
        assert_eq!(report.withdrawn, 5);
        assert!(report.failures.is_empty());
    }

    #[traced_test]
    #[test]
    fn test_failing_pool_is_skipped_or_aborts() {
        // The provider record claims more than the pools can release: its
        // pending withdraw is reset while the first pool's unit stays
        // withdrawing. The first share is zero and the last pool is asked
        // for 2 but holds 1.
        let mut h = Harness::new();
        let first = h.create_pool(1);
        let second = h.create_pool(1);

        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), first.id, &bond(1))
            .unwrap();
        let mut provider = h.keeper.get_provider(&h.store, &admin()).unwrap().unwrap();
        provider.withdraw = 0;
        h.keeper.set_provider(&mut h.store, &provider).unwrap();
        let snapshot = h.store.snapshot();

        let report = h
            .keeper
            .withdraw_from_pools(&mut h.store, &h.ctx, &admin(), &bond(2))
            .unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].pool_id, second.id);
        assert_eq!(report.shortfall(), 2);

        let mut aborting = Harness::with_config(ShieldConfig::with_failure_policy(
            WithdrawFailurePolicy::Abort,
        ));
        aborting.store = snapshot;
        let err = aborting
            .keeper
            .withdraw_from_pools(&mut aborting.store, &aborting.ctx, &admin(), &bond(2))
            .unwrap_err();
        assert!(matches!(
            err,
            ShieldError::PartialWithdrawal { withdrawn: 0, .. }
        ));
    }
}
