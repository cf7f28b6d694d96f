//! Caller-facing cache facade
//!
//! Ties a store, the fetch coordinator, an upstream source and the TTL policy
//! together behind `resolve(entity_type, parts)`. Built once at startup and
//! shared by request handlers.

use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheStore, Clock, FileStore, MemoryStore, ReclaimConfig, Reclaimer, StoreError, SystemClock};
use crate::config::{CacheConfig, TtlPolicy};
use crate::coordinator::{FetchCoordinator, FetchOutcome, Resolved};
use crate::error::ResolveError;
use crate::key::{make_key, EntityKey, EntityType};
use crate::upstream::{HttpUpstream, UpstreamError, UpstreamSource};

/// Cached, normalized access to the upstream football API
#[derive(Clone)]
pub struct FootballCache {
    coordinator: FetchCoordinator,
    upstream: Arc<dyn UpstreamSource>,
    ttls: TtlPolicy,
    reclaim: ReclaimConfig,
}

impl FootballCache {
    /// Assembles a cache from its parts
    pub fn new(store: Arc<dyn CacheStore>, upstream: Arc<dyn UpstreamSource>, ttls: TtlPolicy) -> Self {
        Self::with_clock(store, upstream, ttls, Arc::new(SystemClock))
    }

    /// Assembles a cache judging freshness with `clock`
    pub fn with_clock(
        store: Arc<dyn CacheStore>,
        upstream: Arc<dyn UpstreamSource>,
        ttls: TtlPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            coordinator: FetchCoordinator::new(store).with_clock(clock),
            upstream,
            ttls,
            reclaim: ReclaimConfig::default(),
        }
    }

    /// Sets how `spawn_reclaimer` sweeps expired entries
    pub fn with_reclaim(mut self, reclaim: ReclaimConfig) -> Self {
        self.reclaim = reclaim;
        self
    }

    /// Builds the production stack described by `config`
    ///
    /// Uses a `FileStore` when a cache directory is configured, otherwise an
    /// in-memory store, and an HTTP upstream with the configured timeout.
    pub fn from_config(config: &CacheConfig) -> Result<Self, UpstreamError> {
        let store: Arc<dyn CacheStore> = match config.cache_dir {
            Some(ref dir) => Arc::new(FileStore::with_dir(dir.clone())),
            None => Arc::new(MemoryStore::new()),
        };

        let mut upstream = HttpUpstream::new(config.base_url.clone(), config.request_timeout)?;
        if let Some(ref token) = config.api_token {
            upstream = upstream.with_api_token(token.clone());
        }

        info!(base_url = %config.base_url, cache_dir = ?config.cache_dir, "football cache ready");
        Ok(Self::new(store, Arc::new(upstream), config.ttls.clone()).with_reclaim(config.reclaim.clone()))
    }

    pub fn ttls(&self) -> &TtlPolicy {
        &self.ttls
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    /// Resolves an entity by type and natural key parts
    ///
    /// # Returns
    /// * `Ok(Resolved)` with fresh data, or stale data flagged `stale`; a
    ///   fresh record that could not be stored carries `store_error`
    /// * `Err(ResolveError)` for a bad key, or when the refresh failed and
    ///   nothing was cached
    pub async fn resolve<I, S>(&self, entity: EntityType, parts: I) -> Result<Resolved, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key = make_key(entity, parts)?;
        self.resolve_key(&key).await.into_result()
    }

    /// Resolves a prebuilt key, returning the full outcome
    pub async fn resolve_key(&self, key: &EntityKey) -> FetchOutcome {
        let upstream = self.upstream.clone();
        let fetch_key = key.clone();
        let ttl = self.ttls.ttl_for(key.entity());

        self.coordinator
            .resolve(
                key,
                move || async move { upstream.fetch(&fetch_key).await },
                ttl,
            )
            .await
    }

    /// Drops any cached entry for the key
    pub fn invalidate(&self, key: &EntityKey) -> Result<(), StoreError> {
        self.coordinator.store().invalidate(key)
    }

    /// Deletes fully expired entries now
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        self.coordinator.store().purge_expired()
    }

    /// Starts periodic reclamation of expired entries on the configured interval
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_reclaimer(&self) -> Reclaimer {
        Reclaimer::spawn(self.coordinator.store().clone(), self.reclaim.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::normalize::NormalizedRecord;

    #[derive(Default)]
    struct CannedUpstream {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UpstreamSource for CannedUpstream {
        async fn fetch(&self, key: &EntityKey) -> Result<Value, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match key.entity() {
                EntityType::Squad => Ok(json!({"data": [{"player_id": 7, "name": "Saka", "jerseyNumber": 7}]})),
                _ => Err(UpstreamError::Status {
                    status: 404,
                    url: key.to_string(),
                }),
            }
        }
    }

    fn cache_with(upstream: Arc<CannedUpstream>) -> FootballCache {
        FootballCache::new(Arc::new(MemoryStore::new()), upstream, TtlPolicy::default())
    }

    #[tokio::test]
    async fn test_resolve_by_entity_and_parts() {
        let upstream = Arc::new(CannedUpstream::default());
        let cache = cache_with(upstream.clone());

        let resolved = cache.resolve(EntityType::Squad, ["68"]).await.unwrap();
        assert!(!resolved.stale);
        match resolved.record {
            NormalizedRecord::Squad(squad) => assert_eq!(squad.players[0].jersey_number, Some(7)),
            other => panic!("unexpected record: {:?}", other),
        }

        cache.resolve(EntityType::Squad, ["68"]).await.unwrap();
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_key_is_surfaced_without_fetching() {
        let upstream = Arc::new(CannedUpstream::default());
        let cache = cache_with(upstream.clone());

        let err = cache.resolve(EntityType::TeamStats, ["68"]).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_key");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_error_without_cache_is_surfaced() {
        let cache = cache_with(Arc::new(CannedUpstream::default()));
        let err = cache.resolve(EntityType::Standings, ["82"]).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_error");
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let upstream = Arc::new(CannedUpstream::default());
        let cache = cache_with(upstream.clone());
        let key = make_key(EntityType::Squad, ["68"]).unwrap();

        cache.resolve_key(&key).await;
        cache.invalidate(&key).unwrap();
        cache.resolve_key(&key).await;

        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced_on_every_resolve() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let not_a_dir = temp_dir.path().join("cache");
        std::fs::write(&not_a_dir, "occupied").unwrap();
        let upstream = Arc::new(CannedUpstream::default());
        let cache = FootballCache::new(
            Arc::new(FileStore::with_dir(not_a_dir)),
            upstream.clone(),
            TtlPolicy::default(),
        );

        for _ in 0..3 {
            let resolved = cache.resolve(EntityType::Squad, ["68"]).await.unwrap();
            assert!(!resolved.stale);
            let err = resolved.store_error.expect("store failure should be reported");
            assert_eq!(err.kind(), "store_error");
        }
        // Nothing was persisted, so each call went upstream
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_spawn_reclaimer_uses_configured_interval() {
        let clock = Arc::new(crate::cache::ManualClock::new(chrono::Utc::now()));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let cache = FootballCache::with_clock(
            store.clone(),
            Arc::new(CannedUpstream::default()),
            TtlPolicy::uniform(Duration::from_secs(30)),
            clock.clone(),
        )
        .with_reclaim(ReclaimConfig {
            interval: Duration::from_millis(20),
            enabled: true,
        });

        cache.resolve(EntityType::Squad, ["68"]).await.unwrap();
        clock.advance(chrono::Duration::seconds(31));

        let mut reclaimer = cache.spawn_reclaimer();
        let message = tokio::time::timeout(Duration::from_secs(5), reclaimer.receiver.recv())
            .await
            .expect("reclaimer should report a sweep");
        assert_eq!(message, Some(crate::cache::ReclaimMessage::Reclaimed(1)));
        assert!(store.is_empty());
        reclaimer.shutdown().await;
    }

    #[test]
    fn test_from_config_in_memory() {
        let config = CacheConfig {
            cache_dir: None,
            request_timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let cache = FootballCache::from_config(&config).unwrap();
        assert_eq!(cache.purge_expired().unwrap(), 0);
        assert_eq!(cache.ttls(), &TtlPolicy::default());
        assert_eq!(cache.reclaim.interval, config.reclaim.interval);
    }
}
