//! Export job payload, options and filter bag.

use chrono::{DateTime, NaiveDate, Utc};
use emporium_common::{AppError, AppResult};
use emporium_db::entities::export_job::{self, ExportFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::columns::ExportColumn;

/// Everything a processor needs to run one export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJobPayload {
    pub job_id: String,
    pub resource: String,
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ExportColumn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ExportOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
}

impl ExportJobPayload {
    /// Build the payload for a persisted job.
    pub fn from_job(job: &export_job::Model) -> AppResult<Self> {
        let columns = job
            .columns
            .clone()
            .map(serde_json::from_value::<Vec<ExportColumn>>)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Invalid stored columns: {e}")))?;

        let options = job
            .options
            .clone()
            .map(serde_json::from_value::<ExportOptions>)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Invalid stored options: {e}")))?;

        Ok(Self {
            job_id: job.id.clone(),
            resource: job.resource.clone(),
            format: job.format,
            filters: Some(job.filters.clone()),
            columns,
            options,
            requested_by: job.requested_by.clone(),
        })
    }

    /// The filter bag handed to the handler.
    #[must_use]
    pub fn filters(&self) -> ExportFilters {
        match &self.filters {
            Some(Value::Object(map)) => ExportFilters::new(map.clone()),
            _ => ExportFilters::default(),
        }
    }
}

/// Free-form export options. Keys other than `pageSize` and `fileName` are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Handler-interpreted filters with lenient typed accessors.
///
/// Accessors drop values of the wrong JSON type instead of failing the export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportFilters {
    values: Map<String, Value>,
}

impl ExportFilters {
    #[must_use]
    pub const fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Trimmed, non-empty string.
    #[must_use]
    pub fn string(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            _ => None,
        }
    }

    /// Trimmed, non-empty strings from an array. A lone string counts as one entry.
    #[must_use]
    pub fn string_list(&self, key: &str) -> Vec<String> {
        let items: Vec<&Value> = match self.values.get(key) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(value @ Value::String(_)) => vec![value],
            _ => return Vec::new(),
        };

        items
            .into_iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    #[must_use]
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.values.get(key)?.as_bool()
    }

    /// Finite number.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.values
            .get(key)?
            .as_f64()
            .filter(|n| n.is_finite())
    }

    /// RFC 3339 timestamp or `YYYY-MM-DD` date (midnight UTC).
    #[must_use]
    pub fn datetime(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.string(key)?;

        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Some(ts.with_timezone(&Utc));
        }

        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}
