//! Transactional message handling.
//!
//! Each message runs against an [`OverlayStore`] over the committed store.
//! The overlay is committed only when the keeper operation succeeds, so a
//! failed transaction leaves no trace regardless of where it failed.

use crate::{EndBlockSummary, Keeper, ShieldError};
use shield_core::{BlockContext, ShieldEvent, ShieldMsg};
use shield_store::{KvStore, OverlayStore};
use tracing::{debug, warn};

/// Applies [`ShieldMsg`]s atomically.
#[derive(Debug)]
pub struct ShieldHandler {
    keeper: Keeper,
}

impl ShieldHandler {
    pub fn new(keeper: Keeper) -> Self {
        Self { keeper }
    }

    pub fn keeper(&self) -> &Keeper {
        &self.keeper
    }

    /// Apply one message. Writes reach `store` only on success.
    pub fn deliver(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
        msg: &ShieldMsg,
    ) -> Result<Vec<ShieldEvent>, ShieldError> {
        let mut overlay = OverlayStore::new(store);
        match self.apply(&mut overlay, ctx, msg) {
            Ok(events) => {
                let flushed = overlay.commit();
                debug!(
                    msg = msg.type_name(),
                    signer = %msg.signer(),
                    flushed,
                    events = events.len(),
                    "Message applied"
                );
                Ok(events)
            }
            Err(error) => {
                overlay.discard();
                warn!(
                    msg = msg.type_name(),
                    signer = %msg.signer(),
                    error = %error,
                    "Message rejected, rolled back"
                );
                Err(error)
            }
        }
    }

    /// Run end-of-block processing atomically.
    pub fn end_block(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
    ) -> Result<EndBlockSummary, ShieldError> {
        let mut overlay = OverlayStore::new(store);
        match self.keeper.end_block(&mut overlay, ctx) {
            Ok(summary) => {
                overlay.commit();
                Ok(summary)
            }
            Err(error) => {
                overlay.discard();
                warn!(height = ctx.block_height, error = %error, "End block failed, rolled back");
                Err(error)
            }
        }
    }

    fn apply(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
        msg: &ShieldMsg,
    ) -> Result<Vec<ShieldEvent>, ShieldError> {
        let keeper = &self.keeper;
        match msg {
            ShieldMsg::CreatePool {
                creator,
                shield,
                deposit,
                sponsor,
                time_of_coverage,
                blocks_of_coverage,
            } => {
                let pool = keeper.create_pool(
                    store,
                    ctx,
                    creator,
                    shield,
                    deposit,
                    sponsor,
                    *time_of_coverage,
                    *blocks_of_coverage,
                )?;
                Ok(vec![ShieldEvent::PoolCreated {
                    pool_id: pool.id,
                    shield: pool.shield,
                    sponsor: pool.sponsor,
                }])
            }

            ShieldMsg::UpdatePool {
                updater,
                pool_id,
                shield,
                deposit,
                additional_time,
                additional_blocks,
            } => {
                let pool = keeper.update_pool(
                    store,
                    ctx,
                    updater,
                    *pool_id,
                    shield,
                    deposit,
                    *additional_time,
                    *additional_blocks,
                )?;
                Ok(vec![ShieldEvent::PoolUpdated {
                    pool_id: pool.id,
                    shield: pool.shield,
                }])
            }

            ShieldMsg::PausePool { updater, pool_id } => {
                keeper.pause_pool(store, ctx, updater, *pool_id)?;
                Ok(vec![ShieldEvent::PoolPaused { pool_id: *pool_id }])
            }

            ShieldMsg::ResumePool { updater, pool_id } => {
                keeper.resume_pool(store, ctx, updater, *pool_id)?;
                Ok(vec![ShieldEvent::PoolResumed { pool_id: *pool_id }])
            }

            ShieldMsg::WithdrawFromPools { provider, amount } => {
                let report = keeper.withdraw_from_pools(store, ctx, provider, amount)?;
                Ok(report
                    .queued
                    .into_iter()
                    .map(|withdrawal| ShieldEvent::WithdrawalQueued {
                        pool_id: withdrawal.pool_id,
                        provider: withdrawal.provider,
                        amount: withdrawal.amount,
                        completion_time: withdrawal.completion_time,
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::testing::Harness;
    use crate::{ShieldConfig, WithdrawFailurePolicy};
    use shield_store::{state_digest, MemStore};
    use shield_test_helpers::{admin, bond, test_address, TEST_MIN_POOL_LIFE_SECS};
    use shield_types::{MixedCoins, PoolId};
    use tracing_test::traced_test;

    fn setup(config: ShieldConfig) -> (ShieldHandler, MemStore, BlockContext) {
        let h = Harness::with_config(config);
        (ShieldHandler::new(h.keeper), h.store, h.ctx)
    }

    fn create(shield: u128) -> ShieldMsg {
        ShieldMsg::CreatePool {
            creator: admin(),
            shield: bond(shield),
            deposit: MixedCoins::native(bond(5)),
            sponsor: "acme".to_string(),
            time_of_coverage: TEST_MIN_POOL_LIFE_SECS + 1,
            blocks_of_coverage: 0,
        }
    }

    #[traced_test]
    #[test]
    fn test_deliver_commits_on_success() {
        let (handler, mut store, ctx) = setup(ShieldConfig::default());
        let events = handler.deliver(&mut store, &ctx, &create(100)).unwrap();
        assert_eq!(
            events,
            vec![ShieldEvent::PoolCreated {
                pool_id: PoolId(1),
                shield: bond(100),
                sponsor: "acme".to_string(),
            }]
        );
        assert!(handler.keeper().get_pool(&store, PoolId(1)).unwrap().is_some());
    }

    #[traced_test]
    #[test]
    fn test_deliver_rolls_back_on_failure() {
        let (handler, mut store, ctx) = setup(ShieldConfig::default());
        handler.deliver(&mut store, &ctx, &create(100)).unwrap();
        let before = state_digest(&store);

        let msg = ShieldMsg::PausePool {
            updater: test_address("mallory"),
            pool_id: PoolId(1),
        };
        assert!(matches!(
            handler.deliver(&mut store, &ctx, &msg),
            Err(ShieldError::NotAdmin { .. })
        ));
        assert_eq!(state_digest(&store), before);
    }

    #[traced_test]
    #[test]
    fn test_aborted_withdrawal_rolls_back_earlier_shares() {
        let (handler, mut store, ctx) =
            setup(ShieldConfig::with_failure_policy(WithdrawFailurePolicy::Abort));
        handler.deliver(&mut store, &ctx, &create(100)).unwrap();
        handler.deliver(&mut store, &ctx, &create(100)).unwrap();

        // The provider record overstates what the second pool can release, so
        // the first share succeeds inside the overlay and the last one fails.
        let keeper = handler.keeper();
        let mut provider = keeper.get_provider(&store, &admin()).unwrap().unwrap();
        provider.collateral = bond(300);
        keeper.set_provider(&mut store, &provider).unwrap();
        let before = state_digest(&store);

        let msg = ShieldMsg::WithdrawFromPools {
            provider: admin(),
            amount: bond(300),
        };
        let err = handler.deliver(&mut store, &ctx, &msg).unwrap_err();
        assert!(matches!(
            err,
            ShieldError::PartialWithdrawal { withdrawn: 100, .. }
        ));
        assert_eq!(state_digest(&store), before);
    }

    #[traced_test]
    #[test]
    fn test_withdraw_emits_queued_events() {
        let (handler, mut store, ctx) = setup(ShieldConfig::default());
        handler.deliver(&mut store, &ctx, &create(100)).unwrap();
        handler.deliver(&mut store, &ctx, &create(50)).unwrap();

        let msg = ShieldMsg::WithdrawFromPools {
            provider: admin(),
            amount: bond(90),
        };
        let events = handler.deliver(&mut store, &ctx, &msg).unwrap();
        let shares: Vec<_> = events
            .iter()
            .map(|event| match event {
                ShieldEvent::WithdrawalQueued { amount, .. } => amount.amount_of("ustake"),
                other => panic!("unexpected event {}", other.type_name()),
            })
            .collect();
        assert_eq!(shares, vec![61, 29]);
    }

    #[traced_test]
    #[test]
    fn test_end_block_through_handler() {
        let (handler, mut store, ctx) = setup(ShieldConfig::default());
        handler.deliver(&mut store, &ctx, &create(100)).unwrap();

        let later = ctx.next_block(TEST_MIN_POOL_LIFE_SECS + 2);
        let summary = handler.end_block(&mut store, &later).unwrap();
        assert_eq!(summary.closed, vec![PoolId(1)]);
        assert!(handler.keeper().get_all_pools(&store).unwrap().is_empty());
    }
}
