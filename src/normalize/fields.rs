//! Alias-aware field resolution for heterogeneous upstream JSON
//!
//! Every normalized field is declared once as a [`Field`] with an ordered list
//! of upstream aliases. Aliases may be dotted paths (`player.display_name`) to
//! reach into optional nested includes. The first alias that is present and
//! non-null wins; later aliases are never consulted once one matches.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use super::NormalizationError;

/// A normalized field and the upstream aliases it may arrive under
#[derive(Debug, Clone, Copy)]
pub struct Field {
    /// Name of the field in the normalized record
    pub name: &'static str,
    /// Upstream aliases in priority order
    pub aliases: &'static [&'static str],
}

/// Unwraps a top-level `{"data": ...}` response envelope
pub fn unwrap_envelope(raw: &Value) -> &Value {
    match raw.get("data") {
        Some(inner @ (Value::Object(_) | Value::Array(_))) => inner,
        _ => raw,
    }
}

/// Follows a dotted path; `null` is treated as absent
fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = item;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

impl Field {
    pub const fn new(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases }
    }

    /// Returns the first present, non-null alias value
    pub fn find<'a>(&self, item: &'a Value) -> Option<&'a Value> {
        self.aliases.iter().find_map(|alias| lookup(item, alias))
    }

    fn missing(&self) -> NormalizationError {
        NormalizationError::new(
            self.name,
            format!("missing (tried {})", self.aliases.join(", ")),
        )
    }

    fn invalid(&self, expected: &str, got: &Value) -> NormalizationError {
        NormalizationError::new(self.name, format!("expected {}, got {}", expected, got))
    }

    fn required<T>(
        &self,
        item: &Value,
        parse: impl Fn(&Self, &Value) -> Result<T, NormalizationError>,
    ) -> Result<T, NormalizationError> {
        let value = self.find(item).ok_or_else(|| self.missing())?;
        parse(self, value)
    }

    fn optional<T>(
        &self,
        item: &Value,
        parse: impl Fn(&Self, &Value) -> Result<T, NormalizationError>,
    ) -> Result<Option<T>, NormalizationError> {
        self.find(item).map(|v| parse(self, v)).transpose()
    }

    fn parse_u64(&self, value: &Value) -> Result<u64, NormalizationError> {
        coerce_u64(value).ok_or_else(|| self.invalid("unsigned integer", value))
    }

    fn parse_u32(&self, value: &Value) -> Result<u32, NormalizationError> {
        coerce_u64(value)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| self.invalid("unsigned 32-bit integer", value))
    }

    fn parse_i64(&self, value: &Value) -> Result<i64, NormalizationError> {
        coerce_i64(value).ok_or_else(|| self.invalid("integer", value))
    }

    fn parse_f64(&self, value: &Value) -> Result<f64, NormalizationError> {
        coerce_f64(value).ok_or_else(|| self.invalid("number", value))
    }

    fn parse_string(&self, value: &Value) -> Result<String, NormalizationError> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(self.invalid("non-empty string", value)),
        }
    }

    fn parse_bool(&self, value: &Value) -> Result<bool, NormalizationError> {
        coerce_bool(value).ok_or_else(|| self.invalid("boolean", value))
    }

    fn parse_datetime(&self, value: &Value) -> Result<DateTime<Utc>, NormalizationError> {
        coerce_datetime(value).ok_or_else(|| self.invalid("timestamp", value))
    }

    pub fn required_u64(&self, item: &Value) -> Result<u64, NormalizationError> {
        self.required(item, Self::parse_u64)
    }

    pub fn optional_u64(&self, item: &Value) -> Result<Option<u64>, NormalizationError> {
        self.optional(item, Self::parse_u64)
    }

    pub fn required_u32(&self, item: &Value) -> Result<u32, NormalizationError> {
        self.required(item, Self::parse_u32)
    }

    pub fn optional_u32(&self, item: &Value) -> Result<Option<u32>, NormalizationError> {
        self.optional(item, Self::parse_u32)
    }

    pub fn required_i64(&self, item: &Value) -> Result<i64, NormalizationError> {
        self.required(item, Self::parse_i64)
    }

    pub fn optional_i64(&self, item: &Value) -> Result<Option<i64>, NormalizationError> {
        self.optional(item, Self::parse_i64)
    }

    pub fn required_f64(&self, item: &Value) -> Result<f64, NormalizationError> {
        self.required(item, Self::parse_f64)
    }

    pub fn required_string(&self, item: &Value) -> Result<String, NormalizationError> {
        self.required(item, Self::parse_string)
    }

    pub fn optional_string(&self, item: &Value) -> Result<Option<String>, NormalizationError> {
        self.optional(item, Self::parse_string)
    }

    /// Absent flags default to `false`; present but non-boolean values fail
    pub fn flag(&self, item: &Value) -> Result<bool, NormalizationError> {
        Ok(self.optional(item, Self::parse_bool)?.unwrap_or(false))
    }

    pub fn required_datetime(&self, item: &Value) -> Result<DateTime<Utc>, NormalizationError> {
        self.required(item, Self::parse_datetime)
    }

    /// Resolves a collection that may be a flat list or a keyed grouping
    ///
    /// Accepts the root itself when it is an array. Otherwise the first alias
    /// present is used: an array is taken as-is; an object whose values are
    /// arrays is flattened group by group; an object whose values are objects
    /// is taken as a keyed set of records. Group keys are discarded.
    ///
    /// With no alias present, a non-empty root whose every value is a list or
    /// an object is itself taken as the grouping (e.g. `{"data": {"Goalkeepers": [..]}}`
    /// after the envelope is removed).
    pub fn collection<'a>(&self, root: &'a Value) -> Result<Vec<&'a Value>, NormalizationError> {
        if let Value::Array(items) = root {
            return Ok(items.iter().collect());
        }
        match self.find(root) {
            Some(value) => {
                flatten_groups(value).ok_or_else(|| self.invalid("list or grouped object", value))
            }
            None => match root {
                Value::Object(groups) if !groups.is_empty() => {
                    flatten_groups(root).ok_or_else(|| self.missing())
                }
                _ => Err(self.missing()),
            },
        }
    }
}

fn flatten_groups(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(groups) => {
            let mut items = Vec::new();
            for group in groups.values() {
                match group {
                    Value::Array(members) => items.extend(members.iter()),
                    Value::Object(_) => items.push(group),
                    _ => return None,
                }
            }
            Some(items)
        }
        _ => None,
    }
}

/// Requires a collection item to be a JSON object
pub fn expect_object<'a>(item: &'a Value, at: &str) -> Result<&'a Value, NormalizationError> {
    if item.is_object() {
        Ok(item)
    } else {
        Err(NormalizationError::new(
            at,
            format!("expected object, got {}", item),
        ))
    }
}

/// Numbers pass through; numeric strings are parsed after trimming
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            whole_f64(n.as_f64()?)
                .filter(|v| *v >= 0.0 && *v < u64::MAX as f64)
                .map(|v| v as u64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| coerce_u64(&Value::from(s.parse::<f64>().ok()?)))
        }
        _ => None,
    }
}

pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            whole_f64(n.as_f64()?)
                .filter(|v| *v >= i64::MIN as f64 && *v < i64::MAX as f64)
                .map(|v| v as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| coerce_i64(&Value::from(s.parse::<f64>().ok()?)))
        }
        _ => None,
    }
}

/// Accepts whole floats like `3.0`; rejects fractions
fn whole_f64(n: f64) -> Option<f64> {
    (n.is_finite() && n.fract() == 0.0).then_some(n)
}

pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or unix seconds
pub fn coerce_datetime(value: &Value) -> Option<DateTime<Utc>> {
    if let Value::String(s) = value {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Some(naive.and_utc());
            }
        }
    }
    let secs = coerce_i64(value)?;
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const JERSEY: Field = Field::new("jersey_number", &["jersey_number", "jerseyNumber"]);
    const NAME: Field = Field::new("name", &["player.display_name", "name"]);

    #[test]
    fn test_first_present_alias_wins() {
        let item = json!({"jersey_number": 7, "jerseyNumber": 9});
        assert_eq!(JERSEY.optional_u32(&item).unwrap(), Some(7));
    }

    #[test]
    fn test_null_alias_falls_through() {
        let item = json!({"jersey_number": null, "jerseyNumber": 9});
        assert_eq!(JERSEY.optional_u32(&item).unwrap(), Some(9));
    }

    #[test]
    fn test_absent_optional_is_none() {
        assert_eq!(JERSEY.optional_u32(&json!({})).unwrap(), None);
    }

    #[test]
    fn test_dotted_path_reaches_nested_include() {
        let item = json!({"player": {"display_name": "B. Saka"}, "name": "Bukayo Saka"});
        assert_eq!(NAME.required_string(&item).unwrap(), "B. Saka");

        let flat = json!({"player": null, "name": "Bukayo Saka"});
        assert_eq!(NAME.required_string(&flat).unwrap(), "Bukayo Saka");
    }

    #[test]
    fn test_missing_required_names_field() {
        let err = NAME.required_string(&json!({})).unwrap_err();
        assert_eq!(err.field, "name");
        assert!(err.reason.contains("player.display_name"));
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        assert_eq!(coerce_u64(&json!("68")), Some(68));
        assert_eq!(coerce_u64(&json!(" 12 ")), Some(12));
        assert_eq!(coerce_u64(&json!(3.0)), Some(3));
        assert_eq!(coerce_i64(&json!("-4")), Some(-4));
        assert_eq!(coerce_i64(&json!(-4.0)), Some(-4));
        assert_eq!(coerce_f64(&json!("55.5")), Some(55.5));
    }

    #[test]
    fn test_non_numeric_values_fail() {
        assert_eq!(coerce_u64(&json!("ten")), None);
        assert_eq!(coerce_u64(&json!(-1)), None);
        assert_eq!(coerce_u64(&json!(2.5)), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!(true)), None);

        let err = JERSEY.optional_u32(&json!({"jerseyNumber": "ten"})).unwrap_err();
        assert_eq!(err.field, "jersey_number");
        assert!(err.reason.contains("unsigned"));
    }

    #[test]
    fn test_coerce_bool_variants() {
        assert_eq!(coerce_bool(&json!(true)), Some(true));
        assert_eq!(coerce_bool(&json!(0)), Some(false));
        assert_eq!(coerce_bool(&json!("TRUE")), Some(true));
        assert_eq!(coerce_bool(&json!("maybe")), None);
    }

    #[test]
    fn test_coerce_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 8, 17, 14, 0, 0).unwrap();
        assert_eq!(coerce_datetime(&json!("2024-08-17T14:00:00Z")), Some(expected));
        assert_eq!(coerce_datetime(&json!("2024-08-17T16:00:00+02:00")), Some(expected));
        assert_eq!(coerce_datetime(&json!("2024-08-17 14:00:00")), Some(expected));
        assert_eq!(coerce_datetime(&json!(expected.timestamp())), Some(expected));
        assert_eq!(
            coerce_datetime(&json!(expected.timestamp().to_string())),
            Some(expected)
        );
        assert_eq!(coerce_datetime(&json!("next saturday")), None);
    }

    #[test]
    fn test_collection_flat_and_grouped() {
        const ITEMS: Field = Field::new("items", &["items"]);
        let flat = json!({"items": [{"id": 1}, {"id": 2}]});
        assert_eq!(ITEMS.collection(&flat).unwrap().len(), 2);

        let grouped = json!({"items": {"a": [{"id": 1}], "b": [{"id": 2}, {"id": 3}]}});
        assert_eq!(ITEMS.collection(&grouped).unwrap().len(), 3);

        let keyed = json!({"items": {"x": {"id": 1}, "y": {"id": 2}}});
        assert_eq!(ITEMS.collection(&keyed).unwrap().len(), 2);

        let root = json!([{"id": 1}]);
        assert_eq!(ITEMS.collection(&root).unwrap().len(), 1);

        assert!(ITEMS.collection(&json!({"items": 5})).is_err());
        assert!(ITEMS.collection(&json!({})).is_err());
    }

    #[test]
    fn test_collection_root_grouping_without_alias() {
        const ITEMS: Field = Field::new("items", &["items"]);
        let grouped = json!({"a": [{"id": 1}], "b": [{"id": 2}, {"id": 3}]});
        assert_eq!(ITEMS.collection(&grouped).unwrap().len(), 3);

        let keyed = json!({"x": {"id": 1}, "y": {"id": 2}});
        assert_eq!(ITEMS.collection(&keyed).unwrap().len(), 2);

        // Scalar members mean this is a record, not a grouping
        let err = ITEMS.collection(&json!({"a": [{"id": 1}], "season": 2024})).unwrap_err();
        assert_eq!(err.field, "items");
        assert!(err.reason.starts_with("missing"));
    }

    #[test]
    fn test_unwrap_envelope() {
        let wrapped = json!({"data": {"id": 1}, "subscription": []});
        assert_eq!(unwrap_envelope(&wrapped), &json!({"id": 1}));

        let scalar_data = json!({"data": 5});
        assert_eq!(unwrap_envelope(&scalar_data), &scalar_data);
    }
}
