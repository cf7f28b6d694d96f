//! League standings normalization
//!
//! Tables come back either as one flat list of rows or grouped (e.g. cup
//! group stages keyed by group name). Group membership is read from each row,
//! never from the grouping key.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::Field;
use super::{normalize_items, NormalizationError};

const ROWS: Field = Field::new("rows", &["standings", "table", "rows"]);
const SEASON_ID: Field = Field::new("season_id", &["season_id", "seasonId", "season.id"]);

const GROUP: Field = Field::new("group", &["group.name", "group_name", "groupName", "group"]);
const POSITION: Field = Field::new("position", &["position", "rank", "pos"]);
const TEAM_ID: Field = Field::new(
    "team_id",
    &["team_id", "teamId", "participant_id", "team.id", "participant.id"],
);
const TEAM_NAME: Field = Field::new(
    "team_name",
    &["team_name", "teamName", "team.name", "participant.name"],
);
const POINTS: Field = Field::new("points", &["points", "pts", "overall.points"]);
const PLAYED: Field = Field::new(
    "played",
    &["played", "games_played", "gamesPlayed", "overall.games_played"],
);
const WON: Field = Field::new("won", &["won", "wins", "overall.won"]);
const DRAWN: Field = Field::new("drawn", &["drawn", "draws", "draw", "overall.draw"]);
const LOST: Field = Field::new("lost", &["lost", "losses", "overall.lost"]);
const GOAL_DIFFERENCE: Field = Field::new(
    "goal_difference",
    &["goal_difference", "goalDifference", "goal_diff", "total.goal_difference"],
);

/// A league table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRecord {
    pub season_id: Option<u64>,
    /// Ordered by `(group, position, team_id)`
    pub rows: Vec<StandingRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub group: Option<String>,
    pub position: u32,
    pub team_id: u64,
    pub team_name: Option<String>,
    pub points: i64,
    pub played: Option<u32>,
    pub won: Option<u32>,
    pub drawn: Option<u32>,
    pub lost: Option<u32>,
    pub goal_difference: Option<i64>,
}

pub(super) fn normalize(root: &Value) -> Result<StandingsRecord, NormalizationError> {
    let season_id = if root.is_object() {
        SEASON_ID.optional_u64(root)?
    } else {
        None
    };

    let mut rows = normalize_items(ROWS.collection(root)?, ROWS.name, normalize_row)?;
    rows.sort_by(|a, b| {
        a.group
            .cmp(&b.group)
            .then(a.position.cmp(&b.position))
            .then(a.team_id.cmp(&b.team_id))
    });

    Ok(StandingsRecord { season_id, rows })
}

fn normalize_row(item: &Value) -> Result<StandingRow, NormalizationError> {
    Ok(StandingRow {
        group: GROUP.optional_string(item)?,
        position: POSITION.required_u32(item)?,
        team_id: TEAM_ID.required_u64(item)?,
        team_name: TEAM_NAME.optional_string(item)?,
        points: POINTS.required_i64(item)?,
        played: PLAYED.optional_u32(item)?,
        won: WON.optional_u32(item)?,
        drawn: DRAWN.optional_u32(item)?,
        lost: LOST.optional_u32(item)?,
        goal_difference: GOAL_DIFFERENCE.optional_i64(item)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_table_is_ordered_by_position() {
        let raw = json!({
            "season_id": 23614,
            "standings": [
                {"position": 2, "team_id": 19, "points": 80},
                {"position": 1, "team_id": 68, "team_name": "Arsenal", "points": 89, "played": 38, "goal_difference": 62}
            ]
        });
        let record = normalize(&raw).unwrap();
        assert_eq!(record.season_id, Some(23614));
        assert_eq!(record.rows[0].team_id, 68);
        assert_eq!(record.rows[0].team_name.as_deref(), Some("Arsenal"));
        assert_eq!(record.rows[1].team_name, None);
    }

    #[test]
    fn test_upstream_aliases_match_canonical() {
        let canonical = json!({
            "standings": [
                {"position": 1, "team_id": 68, "team_name": "Arsenal", "points": 89, "played": 38, "won": 28, "drawn": 5, "lost": 5, "goal_difference": 62}
            ]
        });
        let upstream = json!({
            "data": [
                {
                    "position": "1",
                    "participant_id": 68,
                    "participant": {"name": "Arsenal"},
                    "points": "89",
                    "overall": {"games_played": 38, "won": 28, "draw": 5, "lost": 5},
                    "total": {"goal_difference": "62"}
                }
            ]
        });
        assert_eq!(
            normalize(super::super::fields::unwrap_envelope(&upstream)).unwrap(),
            normalize(&canonical).unwrap()
        );
    }

    #[test]
    fn test_grouped_table_matches_flat() {
        let flat = json!({
            "table": [
                {"group": "Group B", "position": 1, "team_id": 3, "points": 9},
                {"group": "Group A", "position": 2, "team_id": 2, "points": 4},
                {"group": "Group A", "position": 1, "team_id": 1, "points": 7}
            ]
        });
        let grouped = json!({
            "table": {
                "Group A": [
                    {"group": {"name": "Group A"}, "position": 1, "team_id": 1, "points": 7},
                    {"group": {"name": "Group A"}, "position": 2, "team_id": 2, "points": 4}
                ],
                "Group B": [
                    {"group_name": "Group B", "position": 1, "team_id": 3, "points": 9}
                ]
            }
        });
        let record = normalize(&grouped).unwrap();
        assert_eq!(record, normalize(&flat).unwrap());
        assert_eq!(record.rows[0].group.as_deref(), Some("Group A"));
        assert_eq!(record.rows[2].group.as_deref(), Some("Group B"));
    }

    #[test]
    fn test_negative_points_are_allowed() {
        let raw = json!([{"position": 20, "team_id": 9, "points": "-3"}]);
        assert_eq!(normalize(&raw).unwrap().rows[0].points, -3);
    }

    #[test]
    fn test_missing_points_fails() {
        let raw = json!([{"position": 1, "team_id": 68}]);
        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.field, "rows[0].points");
    }
}
