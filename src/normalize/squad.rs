//! Squad normalization
//!
//! Squads arrive as a flat player list, as a list of squad entries with a
//! nested `player` include, or grouped by position. All three normalize to one
//! player list ordered by `player_id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::Field;
use super::{normalize_items, NormalizationError};

const PLAYERS: Field = Field::new("players", &["players", "squad"]);

const PLAYER_ID: Field = Field::new("player_id", &["player_id", "playerId", "player.id", "id"]);
const NAME: Field = Field::new(
    "name",
    &[
        "display_name",
        "displayName",
        "player.display_name",
        "player.displayName",
        "common_name",
        "name",
        "player.name",
    ],
);
const POSITION: Field = Field::new(
    "position",
    &[
        "detailedPosition",
        "detailed_position",
        "detailedposition.name",
        "position.name",
        "position",
        "player.position",
    ],
);
const JERSEY_NUMBER: Field = Field::new(
    "jersey_number",
    &["jersey_number", "jerseyNumber", "number", "player.jersey_number"],
);
const NATIONALITY: Field = Field::new(
    "nationality",
    &["nationality.name", "nationality", "player.nationality.name", "player.nationality"],
);
const CAPTAIN: Field = Field::new("captain", &["captain", "is_captain", "isCaptain"]);

/// A team's squad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadRecord {
    /// Players ordered by `player_id`
    pub players: Vec<SquadPlayer>,
}

/// One squad member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadPlayer {
    pub player_id: u64,
    pub name: String,
    pub position: Option<String>,
    pub jersey_number: Option<u32>,
    pub nationality: Option<String>,
    pub captain: bool,
}

pub(super) fn normalize(root: &Value) -> Result<SquadRecord, NormalizationError> {
    let items = PLAYERS.collection(root)?;
    let mut players = normalize_items(items, PLAYERS.name, normalize_player)?;
    players.sort_by_key(|p| p.player_id);
    Ok(SquadRecord { players })
}

fn normalize_player(item: &Value) -> Result<SquadPlayer, NormalizationError> {
    Ok(SquadPlayer {
        player_id: PLAYER_ID.required_u64(item)?,
        name: NAME.required_string(item)?,
        position: POSITION.optional_string(item)?,
        jersey_number: JERSEY_NUMBER.optional_u32(item)?,
        nationality: NATIONALITY.optional_string(item)?,
        captain: CAPTAIN.flag(item)?,
    })
}
