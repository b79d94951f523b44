//! Configuration types for the simulator.

use crate::SimulationError;
use serde::{Deserialize, Serialize};
use shield_keeper::ShieldConfig;
use shield_types::PoolParams;
use std::path::Path;

/// Configuration for a simulation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Random seed for deterministic simulation.
    pub seed: u64,

    /// Number of blocks to simulate. One message is delivered per block.
    pub steps: u64,

    /// Simulated seconds between blocks.
    pub block_interval_secs: u64,

    /// Bonded balance of the administrator at genesis.
    pub admin_stake: u64,

    /// Bonding denomination.
    pub bond_denom: String,

    /// Pool parameters served by the simulated parameter store.
    pub params: PoolParams,

    /// Keeper configuration.
    pub keeper: ShieldConfig,

    /// Workload configuration.
    pub workload: WorkloadConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            steps: 500,
            block_interval_secs: 60,
            admin_stake: 1_000_000,
            bond_denom: "ustake".to_string(),
            // Short enough that pools end and withdrawals settle within a
            // default run.
            params: PoolParams {
                min_pool_life_secs: 600,
                withdraw_period_secs: 1_800,
            },
            keeper: ShieldConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, SimulationError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SimulationError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of steps.
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    /// Set the keeper configuration.
    pub fn with_keeper(mut self, keeper: ShieldConfig) -> Self {
        self.keeper = keeper;
        self
    }

    /// Set the workload configuration.
    pub fn with_workload(mut self, workload: WorkloadConfig) -> Self {
        self.workload = workload;
        self
    }
}

/// Relative frequency of each message kind, plus amount bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub create_weight: u32,
    pub update_weight: u32,
    pub pause_weight: u32,
    pub resume_weight: u32,
    pub withdraw_weight: u32,

    /// Largest shield requested by a create or update.
    pub max_shield: u64,

    /// Largest native premium deposit.
    pub max_deposit: u64,

    /// Percentage of messages signed by someone other than the administrator.
    pub foreign_signer_percent: u32,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            create_weight: 4,
            update_weight: 2,
            pause_weight: 1,
            resume_weight: 1,
            withdraw_weight: 3,
            max_shield: 20_000,
            max_deposit: 500,
            foreign_signer_percent: 5,
        }
    }
}

impl WorkloadConfig {
    /// Create a workload that only opens pools.
    pub fn creates_only() -> Self {
        Self {
            update_weight: 0,
            pause_weight: 0,
            resume_weight: 0,
            withdraw_weight: 0,
            ..Default::default()
        }
    }

    /// Set the share of messages signed by non-administrators.
    pub fn with_foreign_signer_percent(mut self, percent: u32) -> Self {
        self.foreign_signer_percent = percent.min(100);
        self
    }

    pub fn total_weight(&self) -> u32 {
        self.create_weight
            + self.update_weight
            + self.pause_weight
            + self.resume_weight
            + self.withdraw_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shield_keeper::WithdrawFailurePolicy;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            seed = 7
            steps = 42

            [keeper]
            withdraw_failure_policy = "abort"

            [workload]
            withdraw_weight = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.steps, 42);
        assert_eq!(
            config.keeper.withdraw_failure_policy,
            WithdrawFailurePolicy::Abort
        );
        assert_eq!(config.workload.withdraw_weight, 10);
        assert_eq!(config.workload.create_weight, 4);
        assert_eq!(config.params, SimulatorConfig::default().params);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(matches!(
            SimulatorConfig::from_toml_str("seed = \"seven\""),
            Err(SimulationError::Config(_))
        ));
    }
}
