//! Single-flight fetch coordination
//!
//! `FetchCoordinator::resolve` serves fresh cache hits directly. On a miss or
//! an expired entry it elects one leader per key to fetch, normalize and
//! store; concurrent callers for the same key await the leader's outcome
//! instead of fetching again. Keys never wait on each other.
//!
//! The leader's work runs in its own tokio task, so a caller that gives up
//! while waiting does not cancel a fetch other callers may still need.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, CacheStore, Clock, SystemClock};
use crate::error::ResolveError;
use crate::key::EntityKey;
use crate::normalize::{normalize, NormalizedRecord};
use crate::upstream::UpstreamError;

/// Result of one coordinator request
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Served from a fresh cache entry or a successful refresh
    Fresh(NormalizedRecord),
    /// Refreshed from upstream, but the store rejected the write; later
    /// callers will not see this value
    Unpersisted {
        payload: NormalizedRecord,
        reason: ResolveError,
    },
    /// The refresh failed; this is the last value we had
    StaleFallback {
        payload: NormalizedRecord,
        reason: ResolveError,
    },
    /// The refresh failed and nothing was cached
    Failure(ResolveError),
}

/// Data handed back to callers, flagged when it is past its TTL
#[derive(Debug, Clone)]
pub struct Resolved {
    pub record: NormalizedRecord,
    pub stale: bool,
    /// Set when the record is fresh but could not be stored
    pub store_error: Option<ResolveError>,
}

impl FetchOutcome {
    /// Converts into the caller-facing result
    ///
    /// Stale fallbacks are data, not errors. A store failure rides along
    /// with the fresh record it could not persist.
    pub fn into_result(self) -> Result<Resolved, ResolveError> {
        match self {
            FetchOutcome::Fresh(record) => Ok(Resolved {
                record,
                stale: false,
                store_error: None,
            }),
            FetchOutcome::Unpersisted { payload, reason } => Ok(Resolved {
                record: payload,
                stale: false,
                store_error: Some(reason),
            }),
            FetchOutcome::StaleFallback { payload, .. } => Ok(Resolved {
                record: payload,
                stale: true,
                store_error: None,
            }),
            FetchOutcome::Failure(e) => Err(e),
        }
    }

    pub fn payload(&self) -> Option<&NormalizedRecord> {
        match self {
            FetchOutcome::Fresh(record) => Some(record),
            FetchOutcome::Unpersisted { payload, .. } => Some(payload),
            FetchOutcome::StaleFallback { payload, .. } => Some(payload),
            FetchOutcome::Failure(_) => None,
        }
    }

    /// True for a fresh hit or a successful refresh, persisted or not
    pub fn is_fresh(&self) -> bool {
        matches!(self, FetchOutcome::Fresh(_) | FetchOutcome::Unpersisted { .. })
    }
}

/// Marker for the one resolution currently running for a key
#[derive(Clone)]
struct InFlight {
    /// Distinguishes this cycle from a later one for the same key
    cycle: u64,
    outcome: Shared<BoxFuture<'static, FetchOutcome>>,
}

type InFlightMap = DashMap<EntityKey, InFlight>;

/// Clears a cycle's marker when the leader finishes, even on panic
struct InFlightGuard {
    in_flight: Arc<InFlightMap>,
    key: EntityKey,
    cycle: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(&self.key, |_, marker| marker.cycle == self.cycle);
    }
}

/// Coordinates cache lookups and upstream refreshes
#[derive(Clone)]
pub struct FetchCoordinator {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    in_flight: Arc<InFlightMap>,
    next_cycle: Arc<AtomicU64>,
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("store", &self.store)
            .field("clock", &self.clock)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl FetchCoordinator {
    /// Creates a coordinator over `store` using wall-clock time
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            in_flight: Arc::new(DashMap::new()),
            next_cycle: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Uses `clock` to judge freshness; give the store the same clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Number of keys with a refresh currently running
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Resolves `key`, fetching from upstream at most once across concurrent callers
    ///
    /// # Arguments
    /// * `key` - The entity to resolve
    /// * `fetch_upstream` - Produces the raw payload; only called by the elected leader
    /// * `ttl` - Freshness window for a newly stored value
    ///
    /// # Behavior
    /// - Returns `Fresh` immediately for a fresh cache hit
    /// - Otherwise joins the in-flight refresh for `key`, or starts one
    /// - On upstream or normalization failure, falls back to the cached value
    ///   if one exists, else returns `Failure`
    ///
    /// Must be called from within a tokio runtime.
    pub async fn resolve<F, Fut>(&self, key: &EntityKey, fetch_upstream: F, ttl: Duration) -> FetchOutcome
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, UpstreamError>> + Send + 'static,
    {
        if let Some(entry) = self.store.get(key) {
            if entry.is_fresh(self.clock.now()) {
                debug!(key = %key, "cache hit");
                return FetchOutcome::Fresh(entry.payload);
            }
            debug!(key = %key, expired_at = %entry.expires_at, "cache entry stale");
        } else {
            debug!(key = %key, "cache miss");
        }

        self.join_or_lead(key, fetch_upstream, ttl).await
    }

    /// Joins the running refresh for `key` or claims leadership and starts one
    fn join_or_lead<F, Fut>(
        &self,
        key: &EntityKey,
        fetch_upstream: F,
        ttl: Duration,
    ) -> Shared<BoxFuture<'static, FetchOutcome>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, UpstreamError>> + Send + 'static,
    {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(marker) => {
                debug!(key = %key, "joining in-flight refresh");
                marker.get().outcome.clone()
            }
            Entry::Vacant(slot) => {
                let cycle = self.next_cycle.fetch_add(1, Ordering::Relaxed);
                let guard = InFlightGuard {
                    in_flight: self.in_flight.clone(),
                    key: key.clone(),
                    cycle,
                };
                let store = self.store.clone();
                let clock = self.clock.clone();
                let key = key.clone();

                let task = tokio::spawn(async move {
                    let _guard = guard;
                    refresh(store.as_ref(), clock.as_ref(), &key, fetch_upstream, ttl).await
                });

                let outcome = async move {
                    task.await.unwrap_or_else(|e| {
                        FetchOutcome::Failure(
                            UpstreamError::Other(format!("refresh task failed: {}", e)).into(),
                        )
                    })
                }
                .boxed()
                .shared();

                slot.insert(InFlight {
                    cycle,
                    outcome: outcome.clone(),
                });
                outcome
            }
        }
    }
}

/// Leader's refresh cycle: re-check, fetch, normalize, store
async fn refresh<F, Fut>(
    store: &dyn CacheStore,
    clock: &dyn Clock,
    key: &EntityKey,
    fetch_upstream: F,
    ttl: Duration,
) -> FetchOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, UpstreamError>>,
{
    // A previous leader may have stored a fresh value after our first read
    let existing = store.get(key);
    if let Some(entry) = existing.as_ref().filter(|e| e.is_fresh(clock.now())) {
        debug!(key = %key, "refreshed by a previous leader");
        return FetchOutcome::Fresh(entry.payload.clone());
    }

    debug!(key = %key, "fetching from upstream");
    let fetched = AssertUnwindSafe(async move { fetch_upstream().await })
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(UpstreamError::Other("upstream fetcher panicked".to_string())));

    let normalized = match fetched {
        Ok(raw) => normalize(key.entity(), &raw).map_err(|e| {
            warn!(key = %key, field = %e.field, reason = %e.reason, "upstream payload failed normalization");
            ResolveError::from(e)
        }),
        Err(e) => {
            warn!(key = %key, error = %e, "upstream fetch failed");
            Err(ResolveError::from(e))
        }
    };

    match normalized {
        Ok(record) => match store.put(key, &record, ttl) {
            Ok(_) => FetchOutcome::Fresh(record),
            Err(e) => {
                error!(key = %key, error = %e, "failed to persist refreshed value");
                FetchOutcome::Unpersisted {
                    payload: record,
                    reason: e.into(),
                }
            }
        },
        Err(reason) => fall_back(key, existing, reason),
    }
}

fn fall_back(key: &EntityKey, existing: Option<CacheEntry>, reason: ResolveError) -> FetchOutcome {
    match existing {
        Some(entry) if reason.allows_stale_fallback() => {
            info!(key = %key, cached_at = %entry.cached_at, reason = %reason, "serving stale value");
            FetchOutcome::StaleFallback {
                payload: entry.payload,
                reason,
            }
        }
        _ => FetchOutcome::Failure(reason),
    }
}
