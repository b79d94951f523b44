//! Cross-record consistency checks.
//!
//! Run after every step by the simulator and at the end of keeper tests.

use crate::{Keeper, ShieldError};
use shield_store::KvStore;
use shield_types::{Address, Coins, PoolId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A broken relationship between stored records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{pool_id} total collateral {recorded} differs from collateral sum {summed}")]
    PoolCollateral {
        pool_id: PoolId,
        recorded: Coins,
        summed: Coins,
    },

    #[error("{provider} collateral {recorded} differs from collateral sum {summed}")]
    ProviderCollateral {
        provider: Address,
        recorded: Coins,
        summed: Coins,
    },

    #[error("{provider} pending withdraw {recorded} differs from queued {queued}")]
    ProviderWithdraw {
        provider: Address,
        recorded: u128,
        queued: u128,
    },

    #[error("{provider} in {pool_id} is withdrawing {withdrawing}, more than its {amount}")]
    OverWithdrawing {
        pool_id: PoolId,
        provider: Address,
        amount: Coins,
        withdrawing: Coins,
    },

    #[error("{provider} in {pool_id} is withdrawing {withdrawing} but has {queued} queued")]
    QueuedWithdrawing {
        pool_id: PoolId,
        provider: Address,
        withdrawing: Coins,
        queued: Coins,
    },

    #[error("{record} references missing {pool_id}")]
    MissingPool {
        pool_id: PoolId,
        record: &'static str,
    },

    #[error("{record} references missing provider {provider}")]
    MissingProvider {
        provider: Address,
        record: &'static str,
    },
}

impl Keeper {
    /// Every violated invariant, empty when state is consistent.
    pub fn check_invariants(
        &self,
        store: &dyn KvStore,
    ) -> Result<Vec<InvariantViolation>, ShieldError> {
        let bond_denom = self.bond_denom();
        let mut violations = Vec::new();

        let withdrawals = self.get_withdrawals(store)?;
        let mut queued_by_collateral: BTreeMap<(PoolId, Address), Coins> = BTreeMap::new();
        for withdrawal in &withdrawals {
            let key = (withdrawal.pool_id, withdrawal.provider.clone());
            let sum = queued_by_collateral.entry(key).or_default();
            *sum = sum.checked_add(&withdrawal.amount)?;
        }

        let mut by_pool: BTreeMap<PoolId, Coins> = BTreeMap::new();
        let mut by_provider: BTreeMap<Address, Coins> = BTreeMap::new();
        for collateral in self.get_all_collaterals(store)? {
            let queued = queued_by_collateral
                .remove(&(collateral.pool_id, collateral.provider.clone()))
                .unwrap_or_default();
            if queued != collateral.withdrawing {
                violations.push(InvariantViolation::QueuedWithdrawing {
                    pool_id: collateral.pool_id,
                    provider: collateral.provider.clone(),
                    withdrawing: collateral.withdrawing.clone(),
                    queued,
                });
            }
            if !collateral.amount.is_all_gte(&collateral.withdrawing) {
                violations.push(InvariantViolation::OverWithdrawing {
                    pool_id: collateral.pool_id,
                    provider: collateral.provider.clone(),
                    amount: collateral.amount.clone(),
                    withdrawing: collateral.withdrawing.clone(),
                });
            }
            let pool_sum = by_pool.entry(collateral.pool_id).or_default();
            *pool_sum = pool_sum.checked_add(&collateral.amount)?;
            let provider_sum = by_provider.entry(collateral.provider).or_default();
            *provider_sum = provider_sum.checked_add(&collateral.amount)?;
        }

        // Queued withdrawals with no collateral behind them.
        for ((pool_id, provider), queued) in queued_by_collateral {
            violations.push(InvariantViolation::QueuedWithdrawing {
                pool_id,
                provider,
                withdrawing: Coins::new(),
                queued,
            });
        }

        let mut queued: BTreeMap<Address, u128> = BTreeMap::new();
        let mut queued_pools = BTreeSet::new();
        for withdrawal in withdrawals {
            queued_pools.insert(withdrawal.pool_id);
            *queued.entry(withdrawal.provider).or_default() +=
                withdrawal.amount.amount_of(&bond_denom);
        }

        for pool in self.get_all_pools(store)? {
            queued_pools.remove(&pool.id);
            let summed = by_pool.remove(&pool.id).unwrap_or_default();
            if summed != pool.total_collateral {
                violations.push(InvariantViolation::PoolCollateral {
                    pool_id: pool.id,
                    recorded: pool.total_collateral,
                    summed,
                });
            }
        }

        for provider in self.get_all_providers(store)? {
            let summed = by_provider.remove(&provider.address).unwrap_or_default();
            if summed != provider.collateral {
                violations.push(InvariantViolation::ProviderCollateral {
                    provider: provider.address.clone(),
                    recorded: provider.collateral.clone(),
                    summed,
                });
            }
            let pending = queued.remove(&provider.address).unwrap_or(0);
            if pending != provider.withdraw {
                violations.push(InvariantViolation::ProviderWithdraw {
                    provider: provider.address,
                    recorded: provider.withdraw,
                    queued: pending,
                });
            }
        }

        violations.extend(by_pool.into_keys().map(|pool_id| InvariantViolation::MissingPool {
            pool_id,
            record: "collateral",
        }));
        violations.extend(queued_pools.into_iter().map(|pool_id| {
            InvariantViolation::MissingPool {
                pool_id,
                record: "withdrawal",
            }
        }));
        violations.extend(by_provider.into_keys().map(|provider| {
            InvariantViolation::MissingProvider {
                provider,
                record: "collateral",
            }
        }));
        violations.extend(queued.into_keys().map(|provider| {
            InvariantViolation::MissingProvider {
                provider,
                record: "withdrawal",
            }
        }));

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::testing::Harness;
    use shield_store::keys;
    use shield_test_helpers::{admin, bond, TEST_WITHDRAW_PERIOD_SECS};
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_consistent_after_lifecycle() {
        let mut h = Harness::new();
        let first = h.create_pool(100);
        h.create_pool(50);
        h.keeper
            .withdraw_from_pools(&mut h.store, &h.ctx, &admin(), &bond(90))
            .unwrap();
        assert!(h.keeper.check_invariants(&h.store).unwrap().is_empty());

        h.advance(TEST_WITHDRAW_PERIOD_SECS);
        h.keeper.complete_withdrawals(&mut h.store, &h.ctx).unwrap();
        assert!(h.keeper.check_invariants(&h.store).unwrap().is_empty());

        h.keeper.close_pool(&mut h.store, first.id).unwrap();
        assert!(h.keeper.check_invariants(&h.store).unwrap().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_detects_total_mismatch() {
        let mut h = Harness::new();
        let mut pool = h.create_pool(100);
        pool.total_collateral = bond(99);
        h.keeper.set_pool(&mut h.store, &pool).unwrap();

        assert_eq!(
            h.keeper.check_invariants(&h.store).unwrap(),
            vec![InvariantViolation::PoolCollateral {
                pool_id: pool.id,
                recorded: bond(99),
                summed: bond(100),
            }]
        );
    }

    #[traced_test]
    #[test]
    fn test_detects_queue_out_of_step_with_collateral() {
        let mut h = Harness::new();
        let pool = h.create_pool(100);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(40))
            .unwrap();
        let mut collateral = h
            .keeper
            .get_collateral(&h.store, pool.id, &admin())
            .unwrap()
            .unwrap();
        collateral.withdrawing = bond(30);
        h.keeper.set_collateral(&mut h.store, &collateral).unwrap();

        assert_eq!(
            h.keeper.check_invariants(&h.store).unwrap(),
            vec![InvariantViolation::QueuedWithdrawing {
                pool_id: pool.id,
                provider: admin(),
                withdrawing: bond(30),
                queued: bond(40),
            }]
        );
    }

    #[traced_test]
    #[test]
    fn test_detects_records_of_missing_pool() {
        let mut h = Harness::new();
        let pool = h.create_pool(100);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(10))
            .unwrap();
        keys::POOLS.remove(&mut h.store, &pool.id).unwrap();

        let violations = h.keeper.check_invariants(&h.store).unwrap();
        assert!(violations.contains(&InvariantViolation::MissingPool {
            pool_id: pool.id,
            record: "collateral",
        }));
        assert!(violations.contains(&InvariantViolation::MissingPool {
            pool_id: pool.id,
            record: "withdrawal",
        }));
    }
}
