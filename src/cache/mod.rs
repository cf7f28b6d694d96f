//! Cache stores for normalized upstream records
//!
//! A store maps each `EntityKey` to at most one live entry holding a
//! normalized payload and its expiry. Stores never judge freshness on their
//! own behalf except when reclaiming: an expired entry is still returned by
//! `get` so callers can serve it as a stale fallback.

mod clock;
mod file;
mod memory;
mod reclaim;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use reclaim::{ReclaimConfig, ReclaimMessage, Reclaimer};

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::key::{EntityKey, EntityType};
use crate::normalize::NormalizedRecord;

/// Errors raised by a cache store's durable backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing storage failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be encoded for storage
    #[error("Failed to encode cache row: {0}")]
    Encode(#[from] serde_json::Error),

    /// The TTL would not place `expires_at` after `cached_at`
    #[error("Invalid TTL {0:?}: entries must expire after they are cached")]
    InvalidTtl(Duration),

    /// The payload was normalized for a different entity type than the key
    #[error("Cannot store a {payload} record under a {key} key")]
    EntityMismatch { key: EntityType, payload: EntityType },
}

/// One live cache entry
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: EntityKey,
    pub payload: NormalizedRecord,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Builds an entry expiring `ttl` after `now`
    ///
    /// Rejects a zero or unrepresentable TTL and payloads normalized for a
    /// different entity type than the key names.
    pub fn new(
        key: &EntityKey,
        payload: &NormalizedRecord,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, StoreError> {
        if payload.entity() != key.entity() {
            return Err(StoreError::EntityMismatch {
                key: key.entity(),
                payload: payload.entity(),
            });
        }
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(StoreError::InvalidTtl(ttl))?;

        Ok(Self {
            key: key.clone(),
            payload: payload.clone(),
            cached_at: now,
            expires_at,
        })
    }

    /// Whether the entry is still fresh at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        is_fresh(self, now)
    }
}

/// `now < entry.expires_at`
pub fn is_fresh(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    now < entry.expires_at
}

/// Durable mapping from entity key to its latest normalized payload
///
/// Implementations enforce one entry per key themselves: concurrent `put`
/// calls for the same key never leave duplicates behind, and the last writer
/// wins. A `put` is visible to later `get` calls in full or not at all.
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Returns the entry for `key`, fresh or expired
    ///
    /// Absence is not an error. Unreadable rows read as absent.
    fn get(&self, key: &EntityKey) -> Option<CacheEntry>;

    /// Upserts `payload` under `key`, expiring `ttl` from now
    fn put(
        &self,
        key: &EntityKey,
        payload: &NormalizedRecord,
        ttl: Duration,
    ) -> Result<CacheEntry, StoreError>;

    /// Removes any entry for `key`; a no-op when absent
    fn invalidate(&self, key: &EntityKey) -> Result<(), StoreError>;

    /// Deletes entries that have fully expired, returning how many went
    fn purge_expired(&self) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::make_key;
    use crate::normalize::{normalize, SquadRecord};
    use chrono::TimeZone;
    use serde_json::json;

    fn squad_key() -> EntityKey {
        make_key(EntityType::Squad, ["68"]).unwrap()
    }

    fn empty_squad() -> NormalizedRecord {
        NormalizedRecord::Squad(SquadRecord { players: vec![] })
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let now = Utc.with_ymd_and_hms(2024, 8, 17, 12, 0, 0).unwrap();
        let entry = CacheEntry::new(&squad_key(), &empty_squad(), now, Duration::from_secs(600)).unwrap();

        assert_eq!(entry.cached_at, now);
        assert_eq!(entry.expires_at, now + chrono::Duration::seconds(600));
        assert!(entry.is_fresh(now));
        assert!(entry.is_fresh(now + chrono::Duration::seconds(599)));
        assert!(!entry.is_fresh(now + chrono::Duration::seconds(600)));
        assert!(!is_fresh(&entry, now + chrono::Duration::hours(1)));
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let err = CacheEntry::new(&squad_key(), &empty_squad(), Utc::now(), Duration::ZERO).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTtl(_)));
    }

    #[test]
    fn test_mismatched_payload_is_rejected() {
        let standings = normalize(EntityType::Standings, &json!([])).unwrap();
        let err = CacheEntry::new(&squad_key(), &standings, Utc::now(), Duration::from_secs(60)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::EntityMismatch {
                key: EntityType::Squad,
                payload: EntityType::Standings
            }
        ));
    }
}
