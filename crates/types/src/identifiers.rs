//! Domain-specific identifier types.

use radix_common::ScryptoSbor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coverage pool identifier.
///
/// Ids are assigned sequentially from a counter kept in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ScryptoSbor)]
#[sbor(transparent)]
pub struct PoolId(pub u64);

impl PoolId {
    /// First id handed out on a fresh chain.
    pub const FIRST: Self = PoolId(1);

    /// Get the next pool id.
    pub fn next(self) -> Self {
        PoolId(self.0 + 1)
    }

    /// Get the raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for PoolId {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pool({})", self.0)
    }
}

/// Account address.
///
/// Addresses are opaque to this core; equality is byte equality.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ScryptoSbor, Serialize, Deserialize,
)]
#[sbor(transparent)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create an address from its textual form.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the raw address bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_id_next() {
        assert_eq!(PoolId::FIRST.next(), PoolId(2));
        assert_eq!(PoolId::default(), PoolId(1));
        assert_eq!(PoolId(7).to_string(), "Pool(7)");
    }

    #[test]
    fn test_address_ordering_is_bytewise() {
        let a = Address::from("shield1aaa");
        let b = Address::from("shield1aab");
        assert!(a < b);
        assert_eq!(a.as_bytes(), b"shield1aaa");
    }
}
