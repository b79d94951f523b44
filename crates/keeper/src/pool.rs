//! Pool lifecycle: creation, top-ups, pausing and closure.

use crate::{Keeper, ShieldError};
use shield_core::BlockContext;
use shield_store::{keys, KvStore};
use shield_types::{
    Address, Coins, Collateral, MixedCoins, MixedDecCoins, Pool, PoolEnd, PoolId, Provider,
    AVERAGE_BLOCK_TIME_SECS,
};
use tracing::{debug, info};

impl Keeper {
    // ═══════════════════════════════════════════════════════════════════════
    // Records
    // ═══════════════════════════════════════════════════════════════════════

    pub fn get_pool(&self, store: &dyn KvStore, pool_id: PoolId) -> Result<Option<Pool>, ShieldError> {
        Ok(keys::POOLS.may_load(store, &pool_id)?)
    }

    pub fn set_pool(&self, store: &mut dyn KvStore, pool: &Pool) -> Result<(), ShieldError> {
        keys::POOLS.save(store, &pool.id, pool)?;
        Ok(())
    }

    /// Every pool in id order.
    pub fn get_all_pools(&self, store: &dyn KvStore) -> Result<Vec<Pool>, ShieldError> {
        Ok(keys::POOLS
            .entries(store)?
            .into_iter()
            .map(|(_, pool)| pool)
            .collect())
    }

    /// Visit pools in id order until `f` returns `true`.
    pub fn iterate_pools(
        &self,
        store: &dyn KvStore,
        mut f: impl FnMut(&Pool) -> bool,
    ) -> Result<(), ShieldError> {
        for (_, pool) in keys::POOLS.entries(store)? {
            if f(&pool) {
                break;
            }
        }
        Ok(())
    }

    /// Id the next created pool receives.
    pub fn get_next_pool_id(&self, store: &dyn KvStore) -> Result<PoolId, ShieldError> {
        Ok(keys::NEXT_POOL_ID.may_load(store)?.unwrap_or(PoolId::FIRST))
    }

    pub fn set_next_pool_id(&self, store: &mut dyn KvStore, id: PoolId) -> Result<(), ShieldError> {
        keys::NEXT_POOL_ID.save(store, &id)?;
        Ok(())
    }

    pub(crate) fn load_pool(&self, store: &dyn KvStore, pool_id: PoolId) -> Result<Pool, ShieldError> {
        self.get_pool(store, pool_id)?
            .ok_or(ShieldError::NoPoolFound(pool_id))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Whether a requested coverage length exceeds the minimum pool life.
    ///
    /// Blocks are converted at the average block time. Either bound alone is
    /// enough.
    pub fn validate_pool_duration(&self, seconds: u64, blocks: u64) -> bool {
        let min_secs = self.pool_params().min_pool_life_secs;
        seconds > min_secs || blocks.saturating_mul(AVERAGE_BLOCK_TIME_SECS) > min_secs
    }

    /// Open a pool backed by the administrator's stake.
    ///
    /// Nothing is written unless every check and the premium transfer
    /// succeed.
    #[allow(clippy::too_many_arguments)]
    pub fn create_pool(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
        creator: &Address,
        shield: &Coins,
        deposit: &MixedCoins,
        sponsor: &str,
        time_of_coverage: u64,
        blocks_of_coverage: u64,
    ) -> Result<Pool, ShieldError> {
        let admin = self.ensure_admin(store, creator)?;
        self.ensure_pool_duration(time_of_coverage, blocks_of_coverage)?;

        let mut provider = match self.get_provider(store, &admin)? {
            Some(provider) => provider,
            None => self.new_provider(&admin),
        };
        provider.collateral = provider.collateral.checked_add(shield)?;
        self.reserve_stake(&mut provider, shield)?;

        let end = PoolEnd::from_coverage(
            ctx.block_time,
            ctx.block_height,
            time_of_coverage,
            blocks_of_coverage,
        )
        .ok_or_else(|| self.too_short(time_of_coverage, blocks_of_coverage))?;

        let pool_id = self.get_next_pool_id(store)?;
        let premium = MixedDecCoins::from_mixed_coins(deposit);
        let pool = Pool::new(
            pool_id,
            shield.clone(),
            premium,
            sponsor,
            ctx.block_height,
            end,
        );

        self.premium()
            .deposit_native_premium(&deposit.native, creator)?;

        self.set_pool(store, &pool)?;
        self.set_next_pool_id(store, pool_id.next())?;
        self.set_provider(store, &provider)?;
        self.set_collateral(store, &Collateral::new(pool_id, admin, shield.clone()))?;

        info!(
            pool_id = %pool_id,
            shield = %shield,
            sponsor = %pool.sponsor,
            end = ?pool.end,
            "Pool created"
        );
        Ok(pool)
    }

    /// Add shield, premium and coverage to an existing pool.
    ///
    /// The extension must use the same kind of bound the pool was created
    /// with. A mismatched extension refuses the whole update, so the shield
    /// and premium in the same request are not applied either.
    #[allow(clippy::too_many_arguments)]
    pub fn update_pool(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
        updater: &Address,
        pool_id: PoolId,
        shield: &Coins,
        deposit: &MixedCoins,
        additional_time: u64,
        additional_blocks: u64,
    ) -> Result<Pool, ShieldError> {
        let admin = self.ensure_admin(store, updater)?;

        let mut provider = self.load_provider(store, &admin)?;
        provider.collateral = provider.collateral.checked_add(shield)?;
        self.reserve_stake(&mut provider, shield)?;

        let mut pool = self.load_pool(store, pool_id)?;
        self.ensure_pool_duration(additional_time, additional_blocks)?;
        pool.end = extend_end(pool_id, pool.end, additional_time, additional_blocks)?;

        pool.total_collateral = pool.total_collateral.checked_add(shield)?;
        let mut collateral = self
            .get_collateral(store, pool_id, &admin)?
            .unwrap_or_else(|| Collateral::new(pool_id, admin.clone(), Coins::new()));
        collateral.amount = collateral.amount.checked_add(shield)?;
        pool.shield = pool.shield.checked_add(shield)?;
        pool.premium = pool
            .premium
            .checked_add(&MixedDecCoins::from_mixed_coins(deposit))?;

        self.premium()
            .deposit_native_premium(&deposit.native, &admin)?;

        self.set_collateral(store, &collateral)?;
        self.set_pool(store, &pool)?;
        self.set_provider(store, &provider)?;

        info!(
            pool_id = %pool_id,
            added = %shield,
            shield = %pool.shield,
            end = ?pool.end,
            height = ctx.block_height,
            "Pool updated"
        );
        Ok(pool)
    }

    /// Stop a pool from accepting purchases.
    pub fn pause_pool(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
        updater: &Address,
        pool_id: PoolId,
    ) -> Result<Pool, ShieldError> {
        self.ensure_admin(store, updater)?;
        let mut pool = self.load_pool(store, pool_id)?;
        if !pool.active {
            return Err(ShieldError::PoolAlreadyPaused(pool_id));
        }
        pool.active = false;
        self.set_pool(store, &pool)?;
        info!(pool_id = %pool_id, height = ctx.block_height, "Pool paused");
        Ok(pool)
    }

    /// Re-open a paused pool.
    pub fn resume_pool(
        &self,
        store: &mut dyn KvStore,
        ctx: &BlockContext,
        updater: &Address,
        pool_id: PoolId,
    ) -> Result<Pool, ShieldError> {
        self.ensure_admin(store, updater)?;
        let mut pool = self.load_pool(store, pool_id)?;
        if pool.active {
            return Err(ShieldError::PoolAlreadyActive(pool_id));
        }
        pool.active = true;
        self.set_pool(store, &pool)?;
        info!(pool_id = %pool_id, height = ctx.block_height, "Pool resumed");
        Ok(pool)
    }

    /// Whether `pool`'s coverage has ended as of `ctx`.
    pub fn pool_ended(&self, ctx: &BlockContext, pool: &Pool) -> bool {
        pool.has_ended(ctx.block_time, ctx.block_height)
    }

    /// Release the pool's collateral and delete it.
    pub fn close_pool(&self, store: &mut dyn KvStore, pool_id: PoolId) -> Result<(), ShieldError> {
        let pool = self.load_pool(store, pool_id)?;
        self.free_collaterals(store, pool_id)?;
        keys::POOLS.remove(store, &pool_id)?;
        info!(
            pool_id = %pool_id,
            total_collateral = %pool.total_collateral,
            "Pool closed"
        );
        Ok(())
    }

    fn ensure_pool_duration(&self, seconds: u64, blocks: u64) -> Result<(), ShieldError> {
        if self.validate_pool_duration(seconds, blocks) {
            Ok(())
        } else {
            Err(self.too_short(seconds, blocks))
        }
    }

    fn too_short(&self, seconds: u64, blocks: u64) -> ShieldError {
        ShieldError::PoolLifeTooShort {
            seconds,
            blocks,
            min_secs: self.pool_params().min_pool_life_secs,
        }
    }

    /// Move the bond-denomination part of `shield` out of `available`.
    fn reserve_stake(&self, provider: &mut Provider, shield: &Coins) -> Result<(), ShieldError> {
        let bond_denom = self.bond_denom();
        let requested = shield.amount_of(&bond_denom);
        if requested > provider.available {
            return Err(ShieldError::InsufficientStaking {
                address: provider.address.clone(),
                denom: bond_denom,
                available: provider.available,
                requested,
            });
        }
        provider.available -= requested;
        debug!(
            provider = %provider.address,
            reserved = requested,
            available = provider.available,
            "Stake reserved"
        );
        Ok(())
    }
}

/// Extend the pool's end bound. Seconds take precedence over blocks.
fn extend_end(
    pool_id: PoolId,
    end: PoolEnd,
    additional_time: u64,
    additional_blocks: u64,
) -> Result<PoolEnd, ShieldError> {
    let mismatch = |requested| ShieldError::CoverageKindMismatch {
        pool_id,
        actual: if end.is_time_based() { "time" } else { "height" },
        requested,
    };

    if additional_time != 0 {
        match end {
            PoolEnd::Time { end_time } => Ok(PoolEnd::Time {
                end_time: end_time.saturating_add(additional_time),
            }),
            PoolEnd::Height { .. } => Err(mismatch("time")),
        }
    } else if additional_blocks != 0 {
        match end {
            PoolEnd::Height { end_block_height } => Ok(PoolEnd::Height {
                end_block_height: end_block_height.saturating_add(additional_blocks),
            }),
            PoolEnd::Time { .. } => Err(mismatch("blocks")),
        }
    } else {
        Ok(end)
    }
}
