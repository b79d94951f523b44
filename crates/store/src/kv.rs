//! Ordered key-value store interface and the in-memory engine.

use std::ops::Bound;

/// Opaque ordered key-value persistence.
///
/// Implementations must iterate in ascending byte order of keys; the keeper
/// derives its deterministic iteration order from it.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// In-memory ordered store.
///
/// Backed by a persistent map, so `snapshot()` is O(1) and snapshots never
/// observe later writes.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    entries: im::OrdMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap copy of the current contents.
    pub fn snapshot(&self) -> MemStore {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .range((Bound::Included(prefix.to_vec()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Hash every entry of `store` in key order.
///
/// Two replicas that applied the same transactions produce the same digest.
pub fn state_digest(store: &dyn KvStore) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for (key, value) in store.prefix_scan(&[]) {
        hasher.update(&(key.len() as u64).to_le_bytes());
        hasher.update(&key);
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(&value);
    }
    *hasher.finalize().as_bytes()
}
