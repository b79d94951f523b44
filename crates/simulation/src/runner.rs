//! Simulation runner.

use crate::config::SimulatorConfig;
use crate::workload::{ShieldView, ShieldWorkload, WorkloadGenerator};
use crate::SimulationError;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shield_core::{BlockContext, ShieldEvent, ShieldMsg};
use shield_keeper::{ErrorKind, Keeper, ShieldHandler};
use shield_store::MemStore;
use shield_test_helpers::{admin, test_context, MockStaking, RecordingPremiumSink, StaticParams};
use shield_types::{Address, GenesisState};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Counters gathered while a simulation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Messages applied.
    pub accepted: u64,

    /// Rejected messages by error kind.
    pub rejected: BTreeMap<String, u64>,

    pub pools_created: u64,
    pub pools_closed: u64,
    pub withdrawals_queued: u64,
    pub withdrawals_completed: u64,
}

impl SimulationStats {
    pub fn total_rejected(&self) -> u64 {
        self.rejected.values().sum()
    }

    fn record_events(&mut self, events: &[ShieldEvent]) {
        for event in events {
            match event {
                ShieldEvent::PoolCreated { .. } => self.pools_created += 1,
                ShieldEvent::PoolClosed { .. } => self.pools_closed += 1,
                ShieldEvent::WithdrawalQueued { .. } => self.withdrawals_queued += 1,
                ShieldEvent::WithdrawalCompleted { .. } => self.withdrawals_completed += 1,
                ShieldEvent::PoolUpdated { .. }
                | ShieldEvent::PoolPaused { .. }
                | ShieldEvent::PoolResumed { .. } => {}
            }
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub seed: u64,
    pub steps: u64,
    pub stats: SimulationStats,

    /// Pools still open at the end.
    pub open_pools: usize,

    /// Premium collected by the sink, in the bonding denomination.
    pub premium_collected: u128,

    /// Digest of the final store.
    pub digest: [u8; 32],
}

impl SimulationReport {
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Seeded simulator driving a [`ShieldHandler`] over an in-memory store.
///
/// One generated message is delivered per block, followed by end-block
/// processing and a full invariant check.
pub struct Simulator {
    config: SimulatorConfig,
    handler: ShieldHandler,
    store: MemStore,
    ctx: BlockContext,
    rng: ChaCha8Rng,
    workload: ShieldWorkload,
    admin: Address,
    premium: Arc<RecordingPremiumSink>,
    step: u64,
    stats: SimulationStats,
}

impl Simulator {
    /// Build the keeper and load a genesis with only the administrator set.
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulationError> {
        let admin = admin();
        let staking = Arc::new(
            MockStaking::with_denom(config.bond_denom.clone())
                .with_balance(&admin, u128::from(config.admin_stake)),
        );
        let params = Arc::new(StaticParams::new(config.params.clone()));
        let premium = Arc::new(RecordingPremiumSink::new());

        let keeper =
            Keeper::new(staking, params, premium.clone()).with_config(config.keeper.clone());
        let mut store = MemStore::new();
        keeper.init_genesis(&mut store, &GenesisState::with_admin(admin.clone()))?;

        let workload = ShieldWorkload::new(
            config.workload.clone(),
            config.params.clone(),
            config.bond_denom.clone(),
        );

        info!(
            seed = config.seed,
            steps = config.steps,
            policy = ?config.keeper.withdraw_failure_policy,
            "Simulator initialized"
        );

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            handler: ShieldHandler::new(keeper),
            store,
            ctx: test_context(),
            workload,
            admin,
            premium,
            step: 0,
            stats: SimulationStats::default(),
            config,
        })
    }

    pub fn keeper(&self) -> &Keeper {
        self.handler.keeper()
    }

    pub fn store(&self) -> &MemStore {
        &self.store
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Advance one block: deliver a message, run end-block, check invariants.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        self.step += 1;
        self.ctx = self.ctx.next_block(self.config.block_interval_secs);

        let msg = self.next_msg()?;
        match self.handler.deliver(&mut self.store, &self.ctx, &msg) {
            Ok(events) => {
                self.stats.accepted += 1;
                self.stats.record_events(&events);
            }
            // Store and arithmetic failures are bugs, not rejections.
            Err(error) if error.kind() == ErrorKind::Internal => return Err(error.into()),
            Err(error) => {
                *self
                    .stats
                    .rejected
                    .entry(format!("{:?}", error.kind()))
                    .or_default() += 1;
            }
        }

        let summary = self.handler.end_block(&mut self.store, &self.ctx)?;
        self.stats.record_events(&summary.events());

        let violations = self.keeper().check_invariants(&self.store)?;
        if !violations.is_empty() {
            return Err(SimulationError::Invariant {
                step: self.step,
                violations,
            });
        }

        debug!(
            step = self.step,
            height = self.ctx.block_height,
            msg = msg.type_name(),
            completed = summary.completed.len(),
            closed = summary.closed.len(),
            "Step complete"
        );
        Ok(())
    }

    /// Run every configured step and report.
    pub fn run(mut self) -> Result<SimulationReport, SimulationError> {
        for _ in 0..self.config.steps {
            self.step()?;
        }
        let report = self.report()?;
        info!(
            seed = report.seed,
            accepted = report.stats.accepted,
            rejected = report.stats.total_rejected(),
            open_pools = report.open_pools,
            digest = %report.digest_hex(),
            "Simulation complete"
        );
        Ok(report)
    }

    pub fn report(&self) -> Result<SimulationReport, SimulationError> {
        let bond_denom = self.keeper().bond_denom();
        Ok(SimulationReport {
            seed: self.config.seed,
            steps: self.step,
            stats: self.stats.clone(),
            open_pools: self.keeper().get_all_pools(&self.store)?.len(),
            premium_collected: self.premium.total().amount_of(&bond_denom),
            digest: self.keeper().state_digest(&self.store),
        })
    }

    fn next_msg(&mut self) -> Result<ShieldMsg, SimulationError> {
        let keeper = self.handler.keeper();
        let pools = keeper.get_all_pools(&self.store)?;
        let withdrawable = keeper
            .get_provider(&self.store, &self.admin)?
            .map(|provider| provider.withdrawable(&keeper.bond_denom()))
            .unwrap_or(0);
        let view = ShieldView {
            admin: &self.admin,
            pools: &pools,
            withdrawable,
        };
        Ok(self.workload.generate_one(&view, &mut self.rng))
    }
}

/// Run `replicas` independent simulators from the same configuration.
pub fn run_replicas(
    config: &SimulatorConfig,
    replicas: usize,
) -> Result<Vec<SimulationReport>, SimulationError> {
    (0..replicas)
        .map(|_| Simulator::new(config.clone())?.run())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use shield_keeper::{ShieldConfig, WithdrawFailurePolicy};
    use tracing_test::traced_test;

    fn config(seed: u64, steps: u64) -> SimulatorConfig {
        SimulatorConfig::default().with_seed(seed).with_steps(steps)
    }

    #[traced_test]
    #[test]
    fn test_replicas_agree() {
        let reports = run_replicas(&config(42, 200), 3).unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[traced_test]
    #[test]
    fn test_seeds_diverge() {
        let a = Simulator::new(config(1, 100)).unwrap().run().unwrap();
        let b = Simulator::new(config(2, 100)).unwrap().run().unwrap();
        assert_ne!(a.digest, b.digest);
    }

    #[traced_test]
    #[test]
    fn test_long_run_exercises_lifecycle() {
        let report = Simulator::new(config(7, 600)).unwrap().run().unwrap();
        assert_eq!(report.steps, 600);
        assert!(report.stats.pools_created > 0);
        assert!(report.stats.pools_closed > 0);
        assert!(report.stats.withdrawals_queued > 0);
        assert!(report.stats.total_rejected() > 0);
    }

    #[traced_test]
    #[test]
    fn test_abort_policy_keeps_invariants() {
        let config = config(11, 300)
            .with_keeper(ShieldConfig::with_failure_policy(WithdrawFailurePolicy::Abort));
        assert!(Simulator::new(config).unwrap().run().is_ok());
    }

    #[traced_test]
    #[test]
    fn test_stranger_only_workload_changes_nothing() {
        let workload = WorkloadConfig::default().with_foreign_signer_percent(100);
        let sim = Simulator::new(config(3, 50).with_workload(workload)).unwrap();
        let genesis_digest = sim.report().unwrap().digest;

        let report = sim.run().unwrap();
        assert_eq!(report.stats.accepted, 0);
        assert_eq!(report.digest, genesis_digest);
    }
}
