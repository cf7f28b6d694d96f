//! Normalization of upstream payloads into stable internal records
//!
//! The upstream football provider renames fields, nests optional includes, and
//! sends collections either as flat lists or grouped by some attribute. Each
//! entity type has one pure normalizer that maps any of those shapes into a
//! closed record, or fails with the offending field. No I/O happens here.

pub mod fields;

mod commentary;
mod fixtures;
mod match_stats;
mod squad;
mod standings;
mod team_stats;

pub use commentary::{CommentaryEntry, CommentaryRecord};
pub use fixtures::{Fixture, FixturesRecord};
pub use match_stats::{MatchStat, MatchStatsRecord};
pub use squad::{SquadPlayer, SquadRecord};
pub use standings::{StandingRow, StandingsRecord};
pub use team_stats::{StatValue, TeamStatsRecord};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::key::EntityType;

/// A required field was missing or an upstream value had the wrong shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to normalize field '{field}': {reason}")]
pub struct NormalizationError {
    /// Path of the offending field in the normalized record
    pub field: String,
    /// What was wrong with it
    pub reason: String,
}

impl NormalizationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Prefixes the field path, e.g. `players[3]` + `jersey_number`
    pub fn within(mut self, prefix: &str) -> Self {
        self.field = format!("{}.{}", prefix, self.field);
        self
    }
}

/// One validated record per entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum NormalizedRecord {
    Squad(SquadRecord),
    TeamStats(TeamStatsRecord),
    MatchStats(MatchStatsRecord),
    Standings(StandingsRecord),
    Fixtures(FixturesRecord),
    Commentary(CommentaryRecord),
}

impl NormalizedRecord {
    /// The entity type this record was normalized for
    pub fn entity(&self) -> EntityType {
        match self {
            NormalizedRecord::Squad(_) => EntityType::Squad,
            NormalizedRecord::TeamStats(_) => EntityType::TeamStats,
            NormalizedRecord::MatchStats(_) => EntityType::MatchStats,
            NormalizedRecord::Standings(_) => EntityType::Standings,
            NormalizedRecord::Fixtures(_) => EntityType::Fixtures,
            NormalizedRecord::Commentary(_) => EntityType::Commentary,
        }
    }
}

/// Normalizes a raw upstream payload for the given entity type
///
/// # Arguments
/// * `entity` - Which entity the payload describes
/// * `raw` - The upstream JSON, with or without a `{"data": ...}` envelope
///
/// # Returns
/// * `Ok(NormalizedRecord)` with every required field populated
/// * `Err(NormalizationError)` naming the first field that failed
pub fn normalize(entity: EntityType, raw: &Value) -> Result<NormalizedRecord, NormalizationError> {
    let root = fields::unwrap_envelope(raw);
    match entity {
        EntityType::Squad => squad::normalize(root).map(NormalizedRecord::Squad),
        EntityType::TeamStats => team_stats::normalize(root).map(NormalizedRecord::TeamStats),
        EntityType::MatchStats => match_stats::normalize(root).map(NormalizedRecord::MatchStats),
        EntityType::Standings => standings::normalize(root).map(NormalizedRecord::Standings),
        EntityType::Fixtures => fixtures::normalize(root).map(NormalizedRecord::Fixtures),
        EntityType::Commentary => commentary::normalize(root).map(NormalizedRecord::Commentary),
    }
}

/// Normalizes every item of a collection, tagging errors with the item index
fn normalize_items<T>(
    items: Vec<&Value>,
    collection: &str,
    item_fn: impl Fn(&Value) -> Result<T, NormalizationError>,
) -> Result<Vec<T>, NormalizationError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let at = format!("{}[{}]", collection, i);
            let item = fields::expect_object(item, &at)?;
            item_fn(item).map_err(|e| e.within(&at))
        })
        .collect()
}
