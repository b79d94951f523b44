//! Storage layer for shield state.
//!
//! - [`KvStore`]: ordered byte-keyed persistence, supplied by the host
//! - [`MemStore`]: in-memory implementation with cheap snapshots
//! - [`OverlayStore`]: write-capturing layer used to make transactions atomic
//! - [`Item`] / [`Map`]: typed, SBOR-encoded records over any `KvStore`
//! - [`keys`]: where each shield record lives

mod collection;
mod error;
pub mod keys;
mod kv;
mod overlay;

pub use collection::{Item, Map, MapKey};
pub use error::StoreError;
pub use kv::{state_digest, KvStore, MemStore};
pub use overlay::OverlayStore;
