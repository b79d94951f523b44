//! Typed collections over a [`KvStore`].
//!
//! An [`Item`] is a single record under a fixed key. A [`Map`] is a keyed
//! family of records under a one-byte namespace. Values are SBOR-encoded; map
//! keys use [`MapKey`], whose encodings sort in the same order as the keys
//! themselves so prefix scans come back in key order.

use crate::{KvStore, StoreError};
use radix_common::data::scrypto::{scrypto_decode, scrypto_encode, ScryptoDecode, ScryptoEncode};
use shield_types::{Address, PoolId};
use std::marker::PhantomData;

/// Order-preserving byte encoding for map keys.
pub trait MapKey: Sized {
    fn to_key_bytes(&self) -> Result<Vec<u8>, StoreError>;

    /// Decode a key, which must span all of `bytes`.
    fn from_key_bytes(bytes: &[u8]) -> Result<Self, StoreError>;
}

impl MapKey for u64 {
    fn to_key_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(self.to_be_bytes().to_vec())
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| StoreError::malformed(bytes, "expected 8 bytes"))?;
        Ok(u64::from_be_bytes(raw))
    }
}

impl MapKey for PoolId {
    fn to_key_bytes(&self) -> Result<Vec<u8>, StoreError> {
        self.0.to_key_bytes()
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        u64::from_key_bytes(bytes).map(PoolId)
    }
}

/// Addresses are length-prefixed (u16 big-endian) so they compose inside
/// tuple keys. Addresses longer than `u16::MAX` bytes have no key.
impl MapKey for Address {
    fn to_key_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let raw = self.as_bytes();
        let len = u16::try_from(raw.len())
            .map_err(|_| StoreError::malformed(&raw[..16], "address longer than 65535 bytes"))?;
        let mut out = Vec::with_capacity(2 + raw.len());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(raw);
        Ok(out)
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < 2 {
            return Err(StoreError::malformed(bytes, "missing address length"));
        }
        let len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        if bytes.len() != 2 + len {
            return Err(StoreError::malformed(bytes, "address length mismatch"));
        }
        let text = std::str::from_utf8(&bytes[2..])
            .map_err(|e| StoreError::malformed(bytes, e.to_string()))?;
        Ok(Address::new(text))
    }
}

impl MapKey for (PoolId, Address) {
    fn to_key_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let mut out = self.0.to_key_bytes()?;
        out.extend(self.1.to_key_bytes()?);
        Ok(out)
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < 8 {
            return Err(StoreError::malformed(bytes, "missing pool id"));
        }
        let (pool, provider) = bytes.split_at(8);
        Ok((PoolId::from_key_bytes(pool)?, Address::from_key_bytes(provider)?))
    }
}

impl MapKey for (u64, u64) {
    fn to_key_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let mut out = self.0.to_key_bytes()?;
        out.extend(self.1.to_key_bytes()?);
        Ok(out)
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::malformed(bytes, "expected 16 bytes"));
        }
        let (a, b) = bytes.split_at(8);
        Ok((u64::from_key_bytes(a)?, u64::from_key_bytes(b)?))
    }
}

fn encode_value<T: ScryptoEncode>(value: &T) -> Result<Vec<u8>, StoreError> {
    scrypto_encode(value).map_err(|e| StoreError::Encode(format!("{:?}", e)))
}

fn decode_value<T: ScryptoDecode>(key: &[u8], bytes: &[u8]) -> Result<T, StoreError> {
    scrypto_decode(bytes).map_err(|e| StoreError::Decode {
        key: hex::encode(key),
        reason: format!("{:?}", e),
    })
}

/// A single record under a fixed key.
pub struct Item<T> {
    key: &'static [u8],
    _value: PhantomData<fn() -> T>,
}

impl<T> Item<T> {
    pub const fn new(key: &'static [u8]) -> Self {
        Self {
            key,
            _value: PhantomData,
        }
    }
}

impl<T: ScryptoEncode + ScryptoDecode> Item<T> {
    pub fn may_load(&self, store: &dyn KvStore) -> Result<Option<T>, StoreError> {
        store
            .get(self.key)
            .map(|bytes| decode_value(self.key, &bytes))
            .transpose()
    }

    pub fn load(&self, store: &dyn KvStore) -> Result<T, StoreError> {
        self.may_load(store)?
            .ok_or_else(|| StoreError::NotFound(hex::encode(self.key)))
    }

    pub fn save(&self, store: &mut dyn KvStore, value: &T) -> Result<(), StoreError> {
        store.set(self.key.to_vec(), encode_value(value)?);
        Ok(())
    }

    pub fn remove(&self, store: &mut dyn KvStore) {
        store.delete(self.key);
    }
}

/// Records keyed by `K` under a namespace prefix.
pub struct Map<K, V> {
    namespace: &'static [u8],
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Map<K, V> {
    pub const fn new(namespace: &'static [u8]) -> Self {
        Self {
            namespace,
            _entry: PhantomData,
        }
    }
}

impl<K: MapKey, V: ScryptoEncode + ScryptoDecode> Map<K, V> {
    fn storage_key(&self, key: &K) -> Result<Vec<u8>, StoreError> {
        let mut out = self.namespace.to_vec();
        out.extend(key.to_key_bytes()?);
        Ok(out)
    }

    pub fn may_load(&self, store: &dyn KvStore, key: &K) -> Result<Option<V>, StoreError> {
        let storage_key = self.storage_key(key)?;
        store
            .get(&storage_key)
            .map(|bytes| decode_value(&storage_key, &bytes))
            .transpose()
    }

    pub fn load(&self, store: &dyn KvStore, key: &K) -> Result<V, StoreError> {
        self.may_load(store, key)?
            .ok_or_else(|| match self.storage_key(key) {
                Ok(storage_key) => StoreError::NotFound(hex::encode(storage_key)),
                Err(e) => e,
            })
    }

    pub fn has(&self, store: &dyn KvStore, key: &K) -> Result<bool, StoreError> {
        Ok(store.has(&self.storage_key(key)?))
    }

    pub fn save(&self, store: &mut dyn KvStore, key: &K, value: &V) -> Result<(), StoreError> {
        let storage_key = self.storage_key(key)?;
        store.set(storage_key, encode_value(value)?);
        Ok(())
    }

    pub fn remove(&self, store: &mut dyn KvStore, key: &K) -> Result<(), StoreError> {
        store.delete(&self.storage_key(key)?);
        Ok(())
    }

    /// Every entry, in key order.
    pub fn entries(&self, store: &dyn KvStore) -> Result<Vec<(K, V)>, StoreError> {
        self.scan(store, &[])
    }

    /// Entries whose key begins with the encoding of `prefix`.
    ///
    /// `prefix` must be a leading component of `K`, e.g. the `PoolId` of a
    /// `(PoolId, Address)` key.
    pub fn prefixed<P: MapKey>(
        &self,
        store: &dyn KvStore,
        prefix: &P,
    ) -> Result<Vec<(K, V)>, StoreError> {
        self.scan(store, &prefix.to_key_bytes()?)
    }

    fn scan(&self, store: &dyn KvStore, sub_prefix: &[u8]) -> Result<Vec<(K, V)>, StoreError> {
        let mut prefix = self.namespace.to_vec();
        prefix.extend_from_slice(sub_prefix);
        store
            .prefix_scan(&prefix)
            .into_iter()
            .map(|(storage_key, bytes)| {
                let key = K::from_key_bytes(&storage_key[self.namespace.len()..])?;
                let value = decode_value(&storage_key, &bytes)?;
                Ok((key, value))
            })
            .collect()
    }
}
