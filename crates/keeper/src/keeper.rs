//! The shield keeper and its collaborator wiring.

use crate::{ShieldConfig, ShieldError};
use shield_core::{ParamSource, PremiumSink, StakingKeeper};
use shield_store::{keys, state_digest, KvStore};
use shield_types::{Address, PoolParams};
use std::sync::Arc;
use tracing::info;

/// Accounting state machine for coverage pools.
///
/// The keeper holds no state of its own. Every operation takes the store it
/// reads and writes, plus the [`BlockContext`](shield_core::BlockContext) of
/// the transaction being applied, so the same keeper can serve the committed
/// store and any overlay stacked on it.
pub struct Keeper {
    staking: Arc<dyn StakingKeeper>,
    params: Arc<dyn ParamSource>,
    premium: Arc<dyn PremiumSink>,
    config: ShieldConfig,
}

impl std::fmt::Debug for Keeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keeper")
            .field("bond_denom", &self.staking.bond_denom())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Keeper {
    /// Create a keeper with the default configuration.
    pub fn new(
        staking: Arc<dyn StakingKeeper>,
        params: Arc<dyn ParamSource>,
        premium: Arc<dyn PremiumSink>,
    ) -> Self {
        Self {
            staking,
            params,
            premium,
            config: ShieldConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ShieldConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    /// Bonding denomination reported by staking.
    pub fn bond_denom(&self) -> String {
        self.staking.bond_denom()
    }

    /// Current pool parameters.
    pub fn pool_params(&self) -> PoolParams {
        self.params.pool_params()
    }

    pub(crate) fn staking(&self) -> &dyn StakingKeeper {
        self.staking.as_ref()
    }

    pub(crate) fn premium(&self) -> &dyn PremiumSink {
        self.premium.as_ref()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Administrator
    // ═══════════════════════════════════════════════════════════════════════

    /// The administrator allowed to create and manage pools.
    pub fn get_admin(&self, store: &dyn KvStore) -> Result<Address, ShieldError> {
        keys::ADMIN.may_load(store)?.ok_or(ShieldError::NoAdmin)
    }

    pub fn set_admin(&self, store: &mut dyn KvStore, admin: &Address) -> Result<(), ShieldError> {
        keys::ADMIN.save(store, admin)?;
        info!(admin = %admin, "Shield administrator set");
        Ok(())
    }

    /// Fail with `NotAdmin` unless `address` is the stored administrator.
    pub(crate) fn ensure_admin(
        &self,
        store: &dyn KvStore,
        address: &Address,
    ) -> Result<Address, ShieldError> {
        let admin = self.get_admin(store)?;
        if &admin != address {
            return Err(ShieldError::NotAdmin {
                address: address.clone(),
            });
        }
        Ok(admin)
    }

    /// Digest of every entry in `store`, for cross-replica comparison.
    pub fn state_digest(&self, store: &dyn KvStore) -> [u8; 32] {
        state_digest(store)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Keeper wired to mock collaborators over an in-memory store.

    use super::*;
    use shield_core::BlockContext;
    use shield_store::MemStore;
    use shield_test_helpers::{
        admin, bond, test_context, MockStaking, RecordingPremiumSink, StaticParams,
        TEST_MIN_POOL_LIFE_SECS,
    };
    use shield_types::{MixedCoins, Pool};

    pub(crate) const ADMIN_STAKE: u128 = 1_000_000;

    pub(crate) struct Harness {
        pub keeper: Keeper,
        pub store: MemStore,
        pub staking: Arc<MockStaking>,
        pub params: Arc<StaticParams>,
        pub sink: Arc<RecordingPremiumSink>,
        pub ctx: BlockContext,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_config(ShieldConfig::default())
        }

        pub fn with_config(config: ShieldConfig) -> Self {
            Self::with_sink(config, None)
        }

        /// Build a harness whose premium sink is `sink` when given.
        pub fn with_sink(config: ShieldConfig, sink: Option<Arc<dyn PremiumSink>>) -> Self {
            let staking = Arc::new(MockStaking::new().with_balance(&admin(), ADMIN_STAKE));
            let params = Arc::new(StaticParams::for_tests());
            let recording = Arc::new(RecordingPremiumSink::new());
            let premium: Arc<dyn PremiumSink> = match sink {
                Some(sink) => sink,
                None => recording.clone() as Arc<dyn PremiumSink>,
            };
            let keeper =
                Keeper::new(staking.clone(), params.clone(), premium).with_config(config);
            let mut store = MemStore::new();
            keeper.set_admin(&mut store, &admin()).unwrap();
            Self {
                keeper,
                store,
                staking,
                params,
                sink: recording,
                ctx: test_context(),
            }
        }

        /// Create a time-bounded pool backed by `shield` of the bond denom.
        pub fn create_pool(&mut self, shield: u128) -> Pool {
            self.keeper
                .create_pool(
                    &mut self.store,
                    &self.ctx,
                    &admin(),
                    &bond(shield),
                    &MixedCoins::native(bond(10)),
                    "sponsor",
                    TEST_MIN_POOL_LIFE_SECS + 1,
                    0,
                )
                .unwrap()
        }

        /// Move the context forward by `secs` and one block per call.
        pub fn advance(&mut self, secs: u64) {
            self.ctx = self.ctx.next_block(secs);
        }
    }
}
