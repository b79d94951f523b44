//! Shield Simulator
//!
//! A deterministic, seeded workload simulator for the shield keeper.
//!
//! # Architecture
//!
//! Each step advances the block context, asks the workload for one
//! [`ShieldMsg`](shield_core::ShieldMsg), delivers it through the
//! [`ShieldHandler`](shield_keeper::ShieldHandler), runs end-block processing
//! and checks every cross-record invariant. Rejected messages are counted,
//! not fatal. A broken invariant or an internal keeper error stops the run.
//!
//! - **Workload Generation**: Weighted message mix with deliberate bad input
//! - **Replicas**: Independent runs from one seed must end in the same digest
//! - **Configuration**: TOML file or builder methods
//!
//! # Example
//!
//! ```ignore
//! use shield_simulation::{Simulator, SimulatorConfig, WorkloadConfig};
//!
//! let config = SimulatorConfig::default()
//!     .with_seed(12345)
//!     .with_steps(1_000)
//!     .with_workload(WorkloadConfig::default().with_foreign_signer_percent(10));
//!
//! let report = Simulator::new(config)?.run()?;
//! println!("digest: {}", report.digest_hex());
//! ```

pub mod config;
mod error;
pub mod runner;
pub mod workload;

pub use config::{SimulatorConfig, WorkloadConfig};
pub use error::SimulationError;
pub use runner::{run_replicas, SimulationReport, SimulationStats, Simulator};
pub use workload::{ShieldView, ShieldWorkload, WorkloadGenerator};
