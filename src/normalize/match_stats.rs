//! Match statistics normalization

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::Field;
use super::{normalize_items, NormalizationError};

const MATCH_ID: Field = Field::new("match_id", &["match_id", "fixture_id", "fixtureId", "id"]);
const HOME_TEAM_ID: Field = Field::new(
    "home_team_id",
    &["home_team_id", "homeTeamId", "localteam_id", "teams.home.id"],
);
const AWAY_TEAM_ID: Field = Field::new(
    "away_team_id",
    &["away_team_id", "awayTeamId", "visitorteam_id", "teams.away.id"],
);
const HOME_SCORE: Field = Field::new(
    "home_score",
    &["home_score", "homeScore", "scores.localteam_score", "score.home"],
);
const AWAY_SCORE: Field = Field::new(
    "away_score",
    &["away_score", "awayScore", "scores.visitorteam_score", "score.away"],
);
const STATS: Field = Field::new("stats", &["statistics", "stats"]);

const STAT_TEAM_ID: Field = Field::new("team_id", &["team_id", "teamId", "participant_id"]);
const STAT_NAME: Field = Field::new(
    "name",
    &["type.developer_name", "type.name", "name", "type"],
);
const STAT_VALUE: Field = Field::new("value", &["data.value", "value"]);

/// Per-team statistics for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStatsRecord {
    pub match_id: u64,
    pub home_team_id: Option<u64>,
    pub away_team_id: Option<u64>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// Ordered by `(team_id, name)`
    pub stats: Vec<MatchStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStat {
    pub team_id: u64,
    pub name: String,
    pub value: f64,
}

pub(super) fn normalize(root: &Value) -> Result<MatchStatsRecord, NormalizationError> {
    let match_id = MATCH_ID.required_u64(root)?;
    let mut stats = normalize_items(STATS.collection(root)?, STATS.name, normalize_stat)?;
    stats.sort_by(|a, b| a.team_id.cmp(&b.team_id).then_with(|| a.name.cmp(&b.name)));

    Ok(MatchStatsRecord {
        match_id,
        home_team_id: HOME_TEAM_ID.optional_u64(root)?,
        away_team_id: AWAY_TEAM_ID.optional_u64(root)?,
        home_score: HOME_SCORE.optional_u32(root)?,
        away_score: AWAY_SCORE.optional_u32(root)?,
        stats,
    })
}

fn normalize_stat(item: &Value) -> Result<MatchStat, NormalizationError> {
    Ok(MatchStat {
        team_id: STAT_TEAM_ID.required_u64(item)?,
        name: STAT_NAME.required_string(item)?,
        value: STAT_VALUE.required_f64(item)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical() -> Value {
        json!({
            "match_id": 19135003,
            "home_team_id": 68,
            "away_team_id": 19,
            "home_score": 2,
            "away_score": 1,
            "stats": [
                {"team_id": 68, "name": "possession", "value": 58.0},
                {"team_id": 19, "name": "possession", "value": 42.0},
                {"team_id": 68, "name": "corners", "value": 7.0}
            ]
        })
    }

    #[test]
    fn test_normalize_orders_stats() {
        let record = normalize(&canonical()).unwrap();
        let order: Vec<(u64, &str)> = record
            .stats
            .iter()
            .map(|s| (s.team_id, s.name.as_str()))
            .collect();
        assert_eq!(order, vec![(19, "possession"), (68, "corners"), (68, "possession")]);
    }

    #[test]
    fn test_upstream_shape_matches_canonical() {
        let raw = json!({
            "id": "19135003",
            "localteam_id": 68,
            "visitorteam_id": "19",
            "scores": {"localteam_score": 2, "visitorteam_score": "1"},
            "statistics": [
                {"participant_id": 68, "type": {"developer_name": "corners"}, "data": {"value": 7}},
                {"participant_id": 68, "type": {"developer_name": "possession"}, "data": {"value": "58"}},
                {"participant_id": 19, "type": {"developer_name": "possession"}, "data": {"value": 42}}
            ]
        });
        assert_eq!(normalize(&raw).unwrap(), normalize(&canonical()).unwrap());
    }

    #[test]
    fn test_stats_grouped_by_team_match_canonical() {
        let raw = json!({
            "fixture_id": 19135003,
            "teams": {"home": {"id": 68}, "away": {"id": 19}},
            "score": {"home": 2, "away": 1},
            "stats": {
                "68": [
                    {"team_id": 68, "name": "possession", "value": 58},
                    {"team_id": 68, "name": "corners", "value": 7}
                ],
                "19": [{"team_id": 19, "name": "possession", "value": 42}]
            }
        });
        assert_eq!(normalize(&raw).unwrap(), normalize(&canonical()).unwrap());
    }

    #[test]
    fn test_missing_match_id_fails() {
        let err = normalize(&json!({"stats": []})).unwrap_err();
        assert_eq!(err.field, "match_id");
    }

    #[test]
    fn test_scores_absent_before_kickoff() {
        let record = normalize(&json!({"id": 5, "statistics": []})).unwrap();
        assert_eq!(record.home_score, None);
        assert_eq!(record.away_score, None);
        assert!(record.stats.is_empty());
    }
}
