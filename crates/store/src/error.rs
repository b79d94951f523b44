//! Error types for the store.

use thiserror::Error;

/// Errors reading or writing typed records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("SBOR encode error: {0}")]
    Encode(String),

    #[error("SBOR decode error at key {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("Malformed key {key}: {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("No entry at key {0}")]
    NotFound(String),
}

impl StoreError {
    pub(crate) fn malformed(key: &[u8], reason: impl Into<String>) -> Self {
        StoreError::MalformedKey {
            key: hex::encode(key),
            reason: reason.into(),
        }
    }
}
