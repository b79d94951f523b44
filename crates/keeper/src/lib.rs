//! Shield keeper: accounting for coverage pools backed by staked collateral.
//!
//! # Architecture
//!
//! ```text
//! ShieldMsg
//!     │
//!     ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ ShieldHandler.deliver(store, ctx, msg)                       │
//! │                                                              │
//! │   1. Open OverlayStore over the committed store              │
//! │   2. Run the Keeper operation against the overlay            │
//! │   3. Ok  → commit overlay, return ShieldEvents               │
//! │      Err → discard overlay, return ShieldError               │
//! └──────────────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! Keeper (stateless; all records live in the store)
//!     ├── pool lifecycle     create / update / pause / resume / close
//!     ├── provider ledger    lazily seeded from bonded balance
//!     ├── collateral ledger  per-pool commitments, withdrawal queue
//!     └── apportioner        one withdrawal split across every pool
//! ```
//!
//! # Components
//!
//! - [`Keeper`] - Operations over a [`KvStore`](shield_store::KvStore)
//! - [`ShieldHandler`] - Atomic message application
//! - [`Apportioner`] - Proportional split with truncation compensation
//! - [`ShieldConfig`] - Failure policy and end-block limits

mod apportion;
mod collateral;
mod config;
mod end_block;
mod error;
mod genesis;
mod handler;
mod invariants;
mod keeper;
mod pool;
mod provider;
mod withdraw;

pub use apportion::Apportioner;
pub use config::{ShieldConfig, WithdrawFailurePolicy};
pub use end_block::EndBlockSummary;
pub use error::{ErrorKind, ShieldError};
pub use handler::ShieldHandler;
pub use invariants::InvariantViolation;
pub use keeper::Keeper;
pub use withdraw::{WithdrawFailure, WithdrawalReport};
