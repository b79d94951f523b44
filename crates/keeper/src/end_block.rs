//! End-of-block processing.

use crate::{Keeper, ShieldError};
use shield_core::{BlockContext, ShieldEvent};
use shield_store::KvStore;
use shield_types::{PoolId, Withdrawal};
use tracing::{debug, info};

/// What [`Keeper::end_block`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndBlockSummary {
    /// Withdrawals settled, in maturity order.
    pub completed: Vec<Withdrawal>,

    /// Pools closed, in id order.
    pub closed: Vec<PoolId>,

    /// Ended pools left open because of the per-block limit.
    pub deferred: usize,
}

impl EndBlockSummary {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.closed.is_empty() && self.deferred == 0
    }

    /// Events for the host, settlements first.
    pub fn events(&self) -> Vec<ShieldEvent> {
        let completed = self
            .completed
            .iter()
            .map(|withdrawal| ShieldEvent::WithdrawalCompleted {
                pool_id: withdrawal.pool_id,
                provider: withdrawal.provider.clone(),
                amount: withdrawal.amount.clone(),
            });
        let closed = self
            .closed
            .iter()
            .map(|pool_id| ShieldEvent::PoolClosed { pool_id: *pool_id });
        completed.chain(closed).collect()
    }
}

impl Keeper {
    /// Settle matured withdrawals, then close pools whose coverage ended.
    pub fn end_block(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
    ) -> Result<EndBlockSummary, ShieldError> {
        let completed = self.complete_withdrawals(store, ctx)?;

        let mut ended = Vec::new();
        self.iterate_pools(store, |pool| {
            if self.pool_ended(ctx, pool) {
                ended.push(pool.id);
            }
            false
        })?;

        let limit = self.config().max_pools_closed_per_block.unwrap_or(usize::MAX);
        let deferred = ended.len().saturating_sub(limit);
        ended.truncate(limit);
        for pool_id in &ended {
            self.close_pool(store, *pool_id)?;
        }

        let summary = EndBlockSummary {
            completed,
            closed: ended,
            deferred,
        };
        if summary.is_empty() {
            debug!(height = ctx.block_height, "Nothing to do at end of block");
        } else {
            info!(
                height = ctx.block_height,
                completed = summary.completed.len(),
                closed = summary.closed.len(),
                deferred,
                "End block processed"
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use crate::keeper::testing::{Harness, ADMIN_STAKE};
    use crate::ShieldConfig;
    use shield_core::ShieldEvent;
    use shield_test_helpers::{admin, bond, TEST_MIN_POOL_LIFE_SECS, TEST_WITHDRAW_PERIOD_SECS};
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_end_block_closes_ended_pools() {
        let mut h = Harness::new();
        let pool = h.create_pool(1_000);

        let summary = h.keeper.end_block(&mut h.store, &h.ctx).unwrap();
        assert!(summary.is_empty());

        h.advance(TEST_MIN_POOL_LIFE_SECS + 2);
        let summary = h.keeper.end_block(&mut h.store, &h.ctx).unwrap();
        assert_eq!(summary.closed, vec![pool.id]);
        assert_eq!(
            summary.events(),
            vec![ShieldEvent::PoolClosed { pool_id: pool.id }]
        );
        assert_eq!(h.keeper.get_pool(&h.store, pool.id).unwrap(), None);

        let provider = h.keeper.get_provider(&h.store, &admin()).unwrap().unwrap();
        assert_eq!(provider.available, ADMIN_STAKE);
    }

    #[traced_test]
    #[test]
    fn test_end_block_settles_before_closing() {
        let mut h = Harness::new();
        let pool = h.create_pool(1_000);
        h.keeper
            .withdraw_collateral(&mut h.store, &h.ctx, &admin(), pool.id, &bond(100))
            .unwrap();

        // The withdraw period outlasts the pool, so the release settles in the
        // same block the pool closes.
        h.advance(TEST_WITHDRAW_PERIOD_SECS);
        let summary = h.keeper.end_block(&mut h.store, &h.ctx).unwrap();
        assert_eq!(summary.completed.len(), 1);
        assert_eq!(summary.closed, vec![pool.id]);
        assert!(matches!(
            summary.events()[0],
            ShieldEvent::WithdrawalCompleted { .. }
        ));

        let provider = h.keeper.get_provider(&h.store, &admin()).unwrap().unwrap();
        assert_eq!(provider.available, ADMIN_STAKE - 100);
        assert!(provider.collateral.is_zero());
        assert_eq!(provider.withdraw, 0);
    }

    #[traced_test]
    #[test]
    fn test_end_block_respects_close_limit() {
        let mut h = Harness::with_config(ShieldConfig::with_max_pools_closed_per_block(2));
        for _ in 0..3 {
            h.create_pool(10);
        }
        h.advance(TEST_MIN_POOL_LIFE_SECS + 2);

        let summary = h.keeper.end_block(&mut h.store, &h.ctx).unwrap();
        assert_eq!(summary.closed.len(), 2);
        assert_eq!(summary.deferred, 1);

        h.advance(5);
        let summary = h.keeper.end_block(&mut h.store, &h.ctx).unwrap();
        assert_eq!(summary.closed.len(), 1);
        assert_eq!(summary.deferred, 0);
        assert!(h.keeper.get_all_pools(&h.store).unwrap().is_empty());
    }
}
