//! Match commentary normalization

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::Field;
use super::{normalize_items, NormalizationError};

const ENTRIES: Field = Field::new("entries", &["comments", "commentaries", "commentary"]);

const MINUTE: Field = Field::new("minute", &["minute", "min"]);
const EXTRA_MINUTE: Field = Field::new("extra_minute", &["extra_minute", "extraMinute", "extra"]);
const TEXT: Field = Field::new("text", &["comment", "text", "body"]);
const IS_GOAL: Field = Field::new("is_goal", &["is_goal", "isGoal", "goal"]);
const ORDER: Field = Field::new("order", &["order", "sort_order", "id"]);

/// Commentary for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryRecord {
    /// Ordered by `(minute, extra_minute, order)`; entries without a minute first
    pub entries: Vec<CommentaryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryEntry {
    pub minute: Option<u32>,
    pub extra_minute: Option<u32>,
    pub text: String,
    pub is_goal: bool,
    pub order: Option<u64>,
}

pub(super) fn normalize(root: &Value) -> Result<CommentaryRecord, NormalizationError> {
    let mut entries = normalize_items(ENTRIES.collection(root)?, ENTRIES.name, normalize_entry)?;
    entries.sort_by_key(|e| (e.minute, e.extra_minute, e.order));
    Ok(CommentaryRecord { entries })
}

fn normalize_entry(item: &Value) -> Result<CommentaryEntry, NormalizationError> {
    Ok(CommentaryEntry {
        minute: MINUTE.optional_u32(item)?,
        extra_minute: EXTRA_MINUTE.optional_u32(item)?,
        text: TEXT.required_string(item)?,
        is_goal: IS_GOAL.flag(item)?,
        order: ORDER.optional_u64(item)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entries_ordered_by_match_time() {
        let raw = json!({
            "comments": [
                {"minute": 90, "extra_minute": 3, "comment": "Full time", "order": 40},
                {"minute": 12, "comment": "GOAL! Saka", "is_goal": true, "order": 5},
                {"minute": 90, "comment": "Four minutes added", "order": 38}
            ]
        });
        let record = normalize(&raw).unwrap();
        let texts: Vec<&str> = record.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["GOAL! Saka", "Four minutes added", "Full time"]);
        assert!(record.entries[0].is_goal);
        assert!(!record.entries[2].is_goal);
    }

    #[test]
    fn test_aliases_match_canonical() {
        let canonical = json!([{"minute": 12, "text": "GOAL! Saka", "is_goal": true, "order": 5}]);
        let upstream = json!({"commentaries": [{"min": "12", "body": "GOAL! Saka", "isGoal": 1, "sort_order": "5"}]});
        assert_eq!(normalize(&upstream).unwrap(), normalize(&canonical).unwrap());
    }

    #[test]
    fn test_blank_text_fails() {
        let err = normalize(&json!([{"minute": 1, "comment": "  "}])).unwrap_err();
        assert_eq!(err.field, "entries[0].text");
    }

    #[test]
    fn test_invalid_goal_flag_fails() {
        let err = normalize(&json!([{"comment": "x", "is_goal": "perhaps"}])).unwrap_err();
        assert_eq!(err.field, "entries[0].is_goal");
    }
}
