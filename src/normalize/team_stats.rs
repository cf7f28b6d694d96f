//! Team statistics normalization
//!
//! Values arrive as a list of `{name, value}` entries (possibly with a nested
//! `type` include and `value` wrapped in a `data`/`value` object) or as a
//! plain `{name: value}` map.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::{coerce_f64, Field};
use super::{normalize_items, NormalizationError};

const VALUES: Field = Field::new("values", &["statistics", "details", "stats", "values"]);
const SEASON_ID: Field = Field::new("season_id", &["season_id", "seasonId", "season.id"]);

const NAME: Field = Field::new(
    "name",
    &["type.developer_name", "type.name", "type.code", "name", "stat", "type"],
);
const VALUE: Field = Field::new(
    "value",
    &["value.total", "value.value", "data.value", "value", "total", "count"],
);

/// Statistics for one team and statistic kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatsRecord {
    pub season_id: Option<u64>,
    /// Values ordered by name
    pub values: Vec<StatValue>,
}

/// A single named statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatValue {
    pub name: String,
    pub value: f64,
}

pub(super) fn normalize(root: &Value) -> Result<TeamStatsRecord, NormalizationError> {
    let season_id = if root.is_object() {
        SEASON_ID.optional_u64(root)?
    } else {
        None
    };

    let mut values = match VALUES.find(root) {
        Some(Value::Object(map)) if map.values().all(|v| !v.is_object() && !v.is_array()) => {
            map.iter()
                .map(|(name, raw)| {
                    coerce_f64(raw)
                        .map(|value| StatValue {
                            name: name.clone(),
                            value,
                        })
                        .ok_or_else(|| {
                            NormalizationError::new(
                                format!("{}.{}", VALUES.name, name),
                                format!("expected number, got {}", raw),
                            )
                        })
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        _ => normalize_items(VALUES.collection(root)?, VALUES.name, normalize_value)?,
    };

    values.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(TeamStatsRecord { season_id, values })
}

fn normalize_value(item: &Value) -> Result<StatValue, NormalizationError> {
    Ok(StatValue {
        name: NAME.required_string(item)?,
        value: VALUE.required_f64(item)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical() -> Value {
        json!({
            "season_id": 23614,
            "values": [
                {"name": "goals", "value": 54.0},
                {"name": "clean_sheets", "value": 12.0}
            ]
        })
    }

    #[test]
    fn test_normalize_canonical_stats() {
        let record = normalize(&canonical()).unwrap();
        assert_eq!(record.season_id, Some(23614));
        assert_eq!(record.values[0].name, "clean_sheets");
        assert_eq!(record.values[1].name, "goals");
    }

    #[test]
    fn test_nested_type_include_matches_canonical() {
        let raw = json!({
            "seasonId": "23614",
            "details": [
                {"type": {"developer_name": "goals", "name": "Goals"}, "value": {"total": "54"}},
                {"type": {"developer_name": "clean_sheets"}, "value": {"total": 12}}
            ]
        });
        assert_eq!(normalize(&raw).unwrap(), normalize(&canonical()).unwrap());
    }

    #[test]
    fn test_map_form_matches_canonical() {
        let raw = json!({"season_id": 23614, "statistics": {"goals": "54", "clean_sheets": 12}});
        assert_eq!(normalize(&raw).unwrap(), normalize(&canonical()).unwrap());
    }

    #[test]
    fn test_root_list_without_season() {
        let raw = json!([{"stat": "goals", "count": 3}]);
        let record = normalize(&raw).unwrap();
        assert_eq!(record.season_id, None);
        assert_eq!(record.values, vec![StatValue { name: "goals".to_string(), value: 3.0 }]);
    }

    #[test]
    fn test_non_numeric_map_value_fails() {
        let raw = json!({"statistics": {"goals": "many"}});
        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.field, "values.goals");
    }

    #[test]
    fn test_missing_value_fails() {
        let raw = json!({"statistics": [{"name": "goals"}]});
        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.field, "values[0].value");
    }
}
