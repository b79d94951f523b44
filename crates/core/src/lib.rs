//! Core interfaces for the shield accounting core.
//!
//! The keeper is a synchronous, deterministic state machine. Everything it
//! needs from the outside world comes through this crate:
//!
//! - [`BlockContext`]: height and time of the block being executed
//! - [`StakingKeeper`], [`ParamSource`], [`PremiumSink`]: host collaborators
//! - [`ShieldMsg`]: the requests it applies, one per transaction
//! - [`ShieldEvent`]: what it reports back after applying them

mod context;
mod event;
mod message;
mod traits;

pub use context::BlockContext;
pub use event::ShieldEvent;
pub use message::ShieldMsg;
pub use traits::{ParamSource, PremiumError, PremiumSink, StakingKeeper};
