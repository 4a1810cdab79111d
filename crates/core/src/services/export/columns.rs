//! Export column definitions, resolution and row projection.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use emporium_common::{AppError, AppResult, ColumnPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flattened export row.
pub type ExportRow = Map<String, Value>;

/// One output column of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportColumn {
    /// Row key the value is read from.
    pub key: String,
    /// Header text for CSV output.
    pub label: String,
    /// Dotted path into the row, used when `key` is not present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Name of the value formatter (`date`, `datetime`, `boolean`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
}

impl ExportColumn {
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            path: None,
            formatter: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(formatter.into());
        self
    }
}

/// Resolve caller-requested columns against a handler's canonical columns.
///
/// An absent or empty request yields the canonical columns in declared order.
/// Otherwise the requested order is kept and each entry is resolved per `policy`.
pub fn resolve_columns(
    canonical: &[ExportColumn],
    requested: Option<&[ExportColumn]>,
    policy: ColumnPolicy,
) -> AppResult<Vec<ExportColumn>> {
    let requested = match requested {
        Some(requested) if !requested.is_empty() => requested,
        _ => return Ok(canonical.to_vec()),
    };

    if policy == ColumnPolicy::UseRequested {
        return Ok(requested.to_vec());
    }

    let known: HashMap<&str, &ExportColumn> =
        canonical.iter().map(|c| (c.key.as_str(), c)).collect();

    requested
        .iter()
        .map(|column| match known.get(column.key.as_str()) {
            Some(definition) => Ok((*definition).clone()),
            None if policy == ColumnPolicy::RejectUnknown => Err(AppError::Validation(format!(
                "Unknown export column: {}",
                column.key
            ))),
            None => Ok(column.clone()),
        })
        .collect()
}

/// Project a row onto `columns`, returning one value per column in order.
#[must_use]
pub fn project_row(row: &ExportRow, columns: &[ExportColumn]) -> Vec<Value> {
    columns
        .iter()
        .map(|column| {
            let value = row
                .get(&column.key)
                .or_else(|| {
                    column
                        .path
                        .as_deref()
                        .and_then(|path| lookup_path(row, path))
                })
                .cloned()
                .unwrap_or(Value::Null);

            apply_formatter(value, column.formatter.as_deref())
        })
        .collect()
}

/// Walk a dotted path through nested objects (numeric segments index arrays).
#[must_use]
pub fn lookup_path<'a>(row: &'a ExportRow, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.').filter(|s| !s.is_empty());
    let mut current = row.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Apply a named formatter. Unknown formatters and mismatched value types leave
/// the value unchanged.
#[must_use]
pub fn apply_formatter(value: Value, formatter: Option<&str>) -> Value {
    let Some(formatter) = formatter else {
        return value;
    };

    match (formatter, value) {
        ("date", Value::String(s)) => match parse_timestamp(&s) {
            Some(ts) => Value::String(ts.format("%Y-%m-%d").to_string()),
            None => Value::String(s),
        },
        ("datetime", Value::String(s)) => match parse_timestamp(&s) {
            Some(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => Value::String(s),
        },
        ("boolean", Value::Bool(b)) => Value::String(if b { "Yes" } else { "No" }.to_string()),
        ("uppercase", Value::String(s)) => Value::String(s.to_uppercase()),
        ("lowercase", Value::String(s)) => Value::String(s.to_lowercase()),
        ("join", Value::Array(items)) => Value::String(
            items
                .iter()
                .map(plain_text)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        (_, value) => value,
    }
}

/// Render a value as plain text (`null` becomes empty).
#[must_use]
pub fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical() -> Vec<ExportColumn> {
        vec![
            ExportColumn::new("id", "ID"),
            ExportColumn::new("sku", "SKU"),
            ExportColumn::new("name", "Name"),
        ]
    }

    fn row(value: Value) -> ExportRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_resolve_columns_empty_returns_canonical() {
        let canonical = canonical();
        assert_eq!(
            resolve_columns(&canonical, None, ColumnPolicy::UseCanonical).unwrap(),
            canonical
        );
        assert_eq!(
            resolve_columns(&canonical, Some(&[]), ColumnPolicy::UseCanonical).unwrap(),
            canonical
        );
    }

    #[test]
    fn test_resolve_columns_prefers_canonical_definition() {
        let requested = [ExportColumn::new("sku", "ignored")];
        let resolved =
            resolve_columns(&canonical(), Some(&requested), ColumnPolicy::UseCanonical).unwrap();

        assert_eq!(resolved, vec![ExportColumn::new("sku", "SKU")]);
    }

    #[test]
    fn test_resolve_columns_keeps_requested_order_and_unknown_keys() {
        let requested = [
            ExportColumn::new("name", "n"),
            ExportColumn::new("extra", "Extra").with_path("meta.extra"),
            ExportColumn::new("id", "i"),
        ];
        let resolved =
            resolve_columns(&canonical(), Some(&requested), ColumnPolicy::UseCanonical).unwrap();

        let keys: Vec<_> = resolved.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["name", "extra", "id"]);
        assert_eq!(resolved[1].path.as_deref(), Some("meta.extra"));
        assert_eq!(resolved[2].label, "ID");
    }

    #[test]
    fn test_resolve_columns_reject_unknown() {
        let requested = [ExportColumn::new("id", "i"), ExportColumn::new("secret", "s")];
        let result = resolve_columns(&canonical(), Some(&requested), ColumnPolicy::RejectUnknown);

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("secret")));
    }

    #[test]
    fn test_resolve_columns_use_requested_is_verbatim() {
        let requested = [ExportColumn::new("sku", "Custom")];
        let resolved =
            resolve_columns(&canonical(), Some(&requested), ColumnPolicy::UseRequested).unwrap();

        assert_eq!(resolved[0].label, "Custom");
    }

    #[test]
    fn test_project_row_prefers_key_then_path() {
        let row = row(json!({
            "id": "u1",
            "profile": { "firstName": "Ada", "tags": ["a", "b"] },
        }));
        let columns = [
            ExportColumn::new("id", "ID"),
            ExportColumn::new("firstName", "First").with_path("profile.firstName"),
            ExportColumn::new("tag", "Tag").with_path("profile.tags.1"),
            ExportColumn::new("missing", "Missing"),
        ];

        assert_eq!(
            project_row(&row, &columns),
            vec![json!("u1"), json!("Ada"), json!("b"), Value::Null]
        );
    }

    #[test]
    fn test_formatters() {
        let ts = json!("2024-03-05T10:20:30.123+02:00");
        assert_eq!(apply_formatter(ts.clone(), Some("date")), json!("2024-03-05"));
        assert_eq!(
            apply_formatter(ts, Some("datetime")),
            json!("2024-03-05T08:20:30Z")
        );
        assert_eq!(apply_formatter(json!(true), Some("boolean")), json!("Yes"));
        assert_eq!(apply_formatter(json!(false), Some("boolean")), json!("No"));
        assert_eq!(apply_formatter(json!("ab"), Some("uppercase")), json!("AB"));
        assert_eq!(apply_formatter(json!(["x", "y"]), Some("join")), json!("x, y"));
        assert_eq!(apply_formatter(json!("keep"), Some("unknown")), json!("keep"));
        assert_eq!(apply_formatter(json!("not a date"), Some("date")), json!("not a date"));
    }
}
