//! Error types for the simulator.

use shield_keeper::{InvariantViolation, ShieldError};
use thiserror::Error;

/// Errors that stop a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    /// Setup or end-block failed. Rejected messages are not errors.
    #[error("Keeper error: {0}")]
    Shield(#[from] ShieldError),

    #[error("Invariants broken at step {step}: {}", format_violations(.violations))]
    Invariant {
        step: u64,
        violations: Vec<InvariantViolation>,
    },
}

fn format_violations(violations: &[InvariantViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
