//! Overlay store for transactional writes.
//!
//! `OverlayStore` wraps a base store and captures every write without
//! touching the base. Reads check the overlay first, then fall through to the
//! base. `commit()` flushes the captured writes; dropping the overlay
//! discards them. The keeper runs each transaction against an overlay so a
//! failed operation leaves nothing behind.

use crate::KvStore;
use std::collections::BTreeMap;
use tracing::trace;

/// A write-capturing layer over another store.
pub struct OverlayStore<'a> {
    /// The underlying store. Only read until `commit()`.
    base: &'a mut dyn KvStore,

    /// Captured writes. `None` marks a deletion.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> OverlayStore<'a> {
    /// Create a new overlay wrapping the given base store.
    pub fn new(base: &'a mut dyn KvStore) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    /// Number of keys written or deleted so far.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Apply captured writes to the base store in key order.
    ///
    /// Returns the number of keys flushed.
    pub fn commit(self) -> usize {
        let OverlayStore { base, writes } = self;
        let flushed = writes.len();
        for (key, value) in writes {
            match value {
                Some(value) => base.set(key, value),
                None => base.delete(&key),
            }
        }
        trace!(flushed, "Committed overlay");
        flushed
    }

    /// Drop captured writes.
    pub fn discard(self) {
        trace!(dropped = self.writes.len(), "Discarded overlay");
    }
}

impl<'a> KvStore for OverlayStore<'a> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(value) => value.clone(),
            None => self.base.get(key),
        }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.prefix_scan(prefix).into_iter().collect();

        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        merged.into_iter().collect()
    }
}
