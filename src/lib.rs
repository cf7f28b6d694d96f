//! footcache library
//!
//! A TTL-based, single-flight response cache that sits between application
//! code and an unreliable football statistics API, normalizing each upstream
//! payload into one stable record per entity type.

pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod key;
pub mod normalize;
pub mod service;
pub mod upstream;

pub use coordinator::{FetchCoordinator, FetchOutcome, Resolved};
pub use error::ResolveError;
pub use key::{make_key, EntityKey, EntityType};
pub use normalize::{normalize, NormalizedRecord};
pub use service::FootballCache;
