//! Entity keys for cacheable upstream objects
//!
//! An `EntityKey` names one logical object from the upstream provider: the
//! entity type plus its natural key (e.g. a team's squad, a league's standings).
//! Keys are immutable once built and serialize to a stable, collision-free
//! string used as the unique index in every cache store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Longest file stem used verbatim; leaves room for temp-file decoration
/// within the usual 255-byte file name limit
pub const MAX_FILE_STEM: usize = 200;

/// Errors raised while building an entity key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The entity type name is not one we know how to cache
    #[error("Unknown entity type: '{0}'. Valid types: squad, team_stats, match_stats, standings, fixtures, commentary")]
    UnknownEntityType(String),

    /// Wrong number of natural key parts for the entity type
    #[error("{entity} expects {expected} key part(s) ({names}), got {actual}")]
    WrongArity {
        entity: EntityType,
        expected: usize,
        actual: usize,
        names: String,
    },

    /// A natural key part was empty or whitespace
    #[error("{entity} key part '{part}' must not be empty")]
    EmptyPart { entity: EntityType, part: &'static str },
}

/// Types of upstream entities that can be cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A team's current squad
    Squad,
    /// One statistic kind for a team (`team_id` + `stat_key`)
    TeamStats,
    /// Per-team statistics for a single match
    MatchStats,
    /// League table
    Standings,
    /// A league's fixture list
    Fixtures,
    /// Live commentary for a match
    Commentary,
}

impl EntityType {
    /// All recognized entity types
    pub const ALL: [EntityType; 6] = [
        EntityType::Squad,
        EntityType::TeamStats,
        EntityType::MatchStats,
        EntityType::Standings,
        EntityType::Fixtures,
        EntityType::Commentary,
    ];

    /// Stable name used in key strings and persisted rows
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Squad => "squad",
            EntityType::TeamStats => "team_stats",
            EntityType::MatchStats => "match_stats",
            EntityType::Standings => "standings",
            EntityType::Fixtures => "fixtures",
            EntityType::Commentary => "commentary",
        }
    }

    /// Names of the natural key parts, in order
    pub fn key_parts(&self) -> &'static [&'static str] {
        match self {
            EntityType::Squad => &["team_id"],
            EntityType::TeamStats => &["team_id", "stat_key"],
            EntityType::MatchStats => &["match_id"],
            EntityType::Standings => &["league_id"],
            EntityType::Fixtures => &["league_id"],
            EntityType::Commentary => &["match_id"],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = KeyError;

    /// Parses an entity type name.
    ///
    /// Case-insensitive; `-` and `_` are ignored so `team-stats`, `team_stats`
    /// and `teamStats` all resolve to the same type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match folded.as_str() {
            "squad" | "squads" => Ok(EntityType::Squad),
            "teamstats" | "teamstatistics" => Ok(EntityType::TeamStats),
            "matchstats" | "matchstatistics" => Ok(EntityType::MatchStats),
            "standings" | "table" => Ok(EntityType::Standings),
            "fixtures" => Ok(EntityType::Fixtures),
            "commentary" | "commentaries" => Ok(EntityType::Commentary),
            _ => Err(KeyError::UnknownEntityType(s.to_string())),
        }
    }
}

/// Deterministic identity of one cacheable unit
///
/// Two keys are equal iff their entity types and every natural key part are
/// equal. Fields are private so a key cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    entity: EntityType,
    parts: Vec<String>,
}

/// Builds an entity key, validating arity and rejecting empty parts
///
/// # Arguments
/// * `entity` - The entity type
/// * `parts` - Natural key parts in the order given by `EntityType::key_parts`
///
/// # Returns
/// * `Ok(EntityKey)` if every required part is present and non-empty
/// * `Err(KeyError)` otherwise
pub fn make_key<I, S>(entity: EntityType, parts: I) -> Result<EntityKey, KeyError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts: Vec<String> = parts
        .into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .collect();
    let names = entity.key_parts();

    if parts.len() != names.len() {
        return Err(KeyError::WrongArity {
            entity,
            expected: names.len(),
            actual: parts.len(),
            names: names.join(", "),
        });
    }

    if let Some(i) = parts.iter().position(|p| p.is_empty()) {
        return Err(KeyError::EmptyPart {
            entity,
            part: names[i],
        });
    }

    Ok(EntityKey { entity, parts })
}

impl EntityKey {
    pub fn entity(&self) -> EntityType {
        self.entity
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Returns the natural key part with the given name, if the entity has one
    pub fn part(&self, name: &str) -> Option<&str> {
        self.entity
            .key_parts()
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.parts.get(i))
            .map(String::as_str)
    }

    /// Filesystem-safe stem for this key
    ///
    /// `+` is always escaped inside parts, so replacing the `:` separator
    /// with it keeps stems collision-free. Stems longer than
    /// `MAX_FILE_STEM` bytes become `{entity}+~{sha256}`; `~` never survives
    /// escaping, so hashed stems cannot clash with plain ones.
    pub fn file_stem(&self) -> String {
        let stem = self.to_string().replace(':', "+");
        if stem.len() <= MAX_FILE_STEM {
            return stem;
        }
        let digest = Sha256::digest(stem.as_bytes());
        format!("{}+~{}", self.entity.as_str(), hex::encode(digest))
    }
}

impl fmt::Display for EntityKey {
    /// `{entity}:{part1}:{part2}` with each part percent-escaped
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity.as_str())?;
        for part in &self.parts {
            write!(f, ":{}", escape_part(part))?;
        }
        Ok(())
    }
}

/// Percent-escapes everything except `[A-Za-z0-9._-]`
pub(crate) fn escape_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for byte in part.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
