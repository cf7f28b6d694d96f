//! In-process cache store
//!
//! Backed by a sharded concurrent map, so reads and writes for unrelated keys
//! only contend when they hash to the same shard, and only briefly.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use super::{CacheEntry, CacheStore, Clock, StoreError, SystemClock};
use crate::key::EntityKey;
use crate::normalize::NormalizedRecord;

/// Keeps entries in memory for the lifetime of the process
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<EntityKey, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store using wall-clock time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store with a custom clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of entries currently held, fresh or expired
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &EntityKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(
        &self,
        key: &EntityKey,
        payload: &NormalizedRecord,
        ttl: Duration,
    ) -> Result<CacheEntry, StoreError> {
        let entry = CacheEntry::new(key, payload, self.clock.now(), ttl)?;
        self.entries.insert(key.clone(), entry.clone());
        debug!(key = %key, expires_at = %entry.expires_at, "stored entry in memory");
        Ok(entry)
    }

    fn invalidate(&self, key: &EntityKey) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let expired: Vec<EntityKey> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_fresh(now))
            .map(|entry| entry.key().clone())
            .collect();

        // Re-check under the shard lock; a concurrent put may have refreshed it
        let removed = expired
            .iter()
            .filter(|key| {
                self.entries
                    .remove_if(*key, |_, entry| !entry.is_fresh(now))
                    .is_some()
            })
            .count();
        Ok(removed)
    }
}
