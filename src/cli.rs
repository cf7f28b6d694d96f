//! Command-line interface parsing for footcache
//!
//! This module handles parsing of CLI arguments using clap and turns them
//! into a `CacheConfig` for startup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;

use crate::cache::ReclaimConfig;
use crate::config::{default_cache_dir, CacheConfig, TtlPolicy, DEFAULT_BASE_URL};
use crate::key::EntityType;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified entity type is not recognized
    #[error("Invalid entity: '{0}'. Valid entities: squad, team_stats, match_stats, standings, fixtures, commentary")]
    InvalidEntity(String),
}

/// footcache - cached, normalized access to football statistics
#[derive(Parser, Debug)]
#[command(name = "footcache")]
#[command(about = "Cached, normalized access to football statistics")]
#[command(version)]
pub struct Cli {
    /// Directory for persisted cache rows (defaults to the XDG cache directory)
    #[arg(long, global = true, env = "FOOTCACHE_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep the cache in memory only
    #[arg(long, global = true, conflicts_with = "cache_dir")]
    pub no_persist: bool,

    /// Upstream API base URL
    #[arg(long, global = true, env = "FOOTCACHE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Upstream API token, sent as the Authorization header
    #[arg(long, global = true, env = "FOOTCACHE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, global = true, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Override the TTL for every entity type, in seconds
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub ttl_secs: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve an entity through the cache and print it as JSON
    ///
    /// Examples:
    ///   footcache resolve squad 68
    ///   footcache resolve team_stats 68 goals
    ///   footcache resolve standings 82
    Resolve {
        /// Entity type
        #[arg(value_parser = parse_entity_arg)]
        entity: EntityType,
        /// Natural key parts, e.g. a team id
        #[arg(required = true)]
        parts: Vec<String>,
    },

    /// Drop the cached entry for an entity
    Invalidate {
        /// Entity type
        #[arg(value_parser = parse_entity_arg)]
        entity: EntityType,
        /// Natural key parts
        #[arg(required = true)]
        parts: Vec<String>,
    },

    /// Delete all fully expired cache entries
    Purge {
        /// Keep running and sweep again every interval until interrupted
        #[arg(long)]
        watch: bool,

        /// Seconds between sweeps in watch mode
        #[arg(long, value_name = "SECS", default_value_t = 900, requires = "watch", value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,
    },

    /// Normalize a captured upstream payload without touching the cache
    Normalize {
        /// Entity type the payload describes
        #[arg(value_parser = parse_entity_arg)]
        entity: EntityType,
        /// JSON file holding the raw payload
        file: PathBuf,
    },
}

/// Parses an entity type argument.
///
/// # Returns
/// * `Ok(EntityType)` if the string names a known entity type
/// * `Err(CliError::InvalidEntity)` otherwise
pub fn parse_entity_arg(s: &str) -> Result<EntityType, CliError> {
    s.parse().map_err(|_| CliError::InvalidEntity(s.to_string()))
}

impl CacheConfig {
    /// Creates a CacheConfig from parsed CLI arguments
    pub fn from_cli(cli: &Cli) -> Self {
        let cache_dir = if cli.no_persist {
            None
        } else {
            cli.cache_dir.clone().or_else(default_cache_dir)
        };
        let ttls = match cli.ttl_secs {
            Some(secs) => TtlPolicy::uniform(Duration::from_secs(secs)),
            None => TtlPolicy::default(),
        };

        let mut reclaim = ReclaimConfig::default();
        if let Command::Purge { interval_secs, .. } = &cli.command {
            reclaim.interval = Duration::from_secs(*interval_secs);
        }

        CacheConfig {
            cache_dir,
            base_url: cli.base_url.clone(),
            api_token: cli.api_token.clone(),
            request_timeout: Duration::from_secs(cli.timeout_secs),
            ttls,
            reclaim,
        }
    }
}
