//! Runtime configuration
//!
//! Defaults mirror how often each kind of football data actually changes:
//! live commentary within seconds, squads and tables over many minutes.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use crate::cache::ReclaimConfig;
use crate::key::EntityType;

/// Default upstream API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.sportmonks.com/v3/football";

/// Freshness window per entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    pub squad: Duration,
    pub team_stats: Duration,
    pub match_stats: Duration,
    pub standings: Duration,
    pub fixtures: Duration,
    pub commentary: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            squad: Duration::from_secs(600),        // 10 minutes
            team_stats: Duration::from_secs(3600),  // 1 hour
            match_stats: Duration::from_secs(60),
            standings: Duration::from_secs(600),
            fixtures: Duration::from_secs(300),
            commentary: Duration::from_secs(30),
        }
    }
}

impl TtlPolicy {
    /// Same TTL for every entity type
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            squad: ttl,
            team_stats: ttl,
            match_stats: ttl,
            standings: ttl,
            fixtures: ttl,
            commentary: ttl,
        }
    }

    pub fn ttl_for(&self, entity: EntityType) -> Duration {
        match entity {
            EntityType::Squad => self.squad,
            EntityType::TeamStats => self.team_stats,
            EntityType::MatchStats => self.match_stats,
            EntityType::Standings => self.standings,
            EntityType::Fixtures => self.fixtures,
            EntityType::Commentary => self.commentary,
        }
    }
}

/// Configuration for a `FootballCache`
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Where rows are persisted; `None` keeps the cache in memory
    pub cache_dir: Option<PathBuf>,
    /// Upstream API base URL
    pub base_url: String,
    /// Sent as the `Authorization` header when set
    pub api_token: Option<String>,
    /// Per-request upstream timeout
    pub request_timeout: Duration,
    pub ttls: TtlPolicy,
    pub reclaim: ReclaimConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(10),
            ttls: TtlPolicy::default(),
            reclaim: ReclaimConfig::default(),
        }
    }
}

/// XDG cache directory (`~/.cache/footcache/` on Linux), if a home directory exists
pub fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "footcache").map(|dirs| dirs.cache_dir().to_path_buf())
}
