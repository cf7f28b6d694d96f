//! Fixture list normalization
//!
//! Fixtures are observed both as a flat list and grouped by match date. The
//! normalized list is ordered by kickoff and then fixture id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::Field;
use super::{normalize_items, NormalizationError};

const FIXTURES: Field = Field::new("fixtures", &["fixtures", "matches"]);

const FIXTURE_ID: Field = Field::new("fixture_id", &["fixture_id", "fixtureId", "id"]);
const KICKOFF: Field = Field::new(
    "kickoff",
    &["starting_at", "startingAt", "kickoff", "starting_at_timestamp", "date"],
);
const HOME_TEAM_ID: Field = Field::new(
    "home_team_id",
    &["home_team_id", "homeTeamId", "localteam_id", "teams.home.id"],
);
const AWAY_TEAM_ID: Field = Field::new(
    "away_team_id",
    &["away_team_id", "awayTeamId", "visitorteam_id", "teams.away.id"],
);
const STATUS: Field = Field::new("status", &["state.short_name", "state.name", "status", "state"]);
const HOME_SCORE: Field = Field::new(
    "home_score",
    &["home_score", "homeScore", "scores.localteam_score", "score.home"],
);
const AWAY_SCORE: Field = Field::new(
    "away_score",
    &["away_score", "awayScore", "scores.visitorteam_score", "score.away"],
);

/// A league's fixtures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixturesRecord {
    /// Ordered by `(kickoff, fixture_id)`
    pub fixtures: Vec<Fixture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture_id: u64,
    pub kickoff: DateTime<Utc>,
    pub home_team_id: Option<u64>,
    pub away_team_id: Option<u64>,
    pub status: Option<String>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

pub(super) fn normalize(root: &Value) -> Result<FixturesRecord, NormalizationError> {
    let mut fixtures = normalize_items(FIXTURES.collection(root)?, FIXTURES.name, normalize_fixture)?;
    fixtures.sort_by(|a, b| {
        a.kickoff
            .cmp(&b.kickoff)
            .then(a.fixture_id.cmp(&b.fixture_id))
    });
    Ok(FixturesRecord { fixtures })
}

fn normalize_fixture(item: &Value) -> Result<Fixture, NormalizationError> {
    Ok(Fixture {
        fixture_id: FIXTURE_ID.required_u64(item)?,
        kickoff: KICKOFF.required_datetime(item)?,
        home_team_id: HOME_TEAM_ID.optional_u64(item)?,
        away_team_id: AWAY_TEAM_ID.optional_u64(item)?,
        status: STATUS.optional_string(item)?,
        home_score: HOME_SCORE.optional_u32(item)?,
        away_score: AWAY_SCORE.optional_u32(item)?,
    })
}
