//! Export job entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of an export job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    /// Job is recorded and waiting to run.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Job is currently being processed.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Job completed successfully.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Job failed.
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl ExportStatus {
    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a forward transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Lowercase string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Export file format.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values.
    #[default]
    #[sea_orm(string_value = "csv")]
    Csv,
    /// JSON array of objects.
    #[sea_orm(string_value = "json")]
    Json,
}

impl ExportFormat {
    /// Parse a format name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// MIME type of the generated file.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

/// An export job.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "export_job")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Resource key of the handler that produces this export.
    #[sea_orm(indexed)]
    pub resource: String,

    /// Export format.
    pub format: ExportFormat,

    /// Current status.
    pub status: ExportStatus,

    /// Handler-specific filters (JSON object).
    #[sea_orm(column_type = "JsonBinary")]
    pub filters: Json,

    /// Requested columns (JSON array of column definitions).
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub columns: Option<Json>,

    /// Free-form options (`pageSize`, `fileName`, ...).
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub options: Option<Json>,

    /// Number of rows written (when completed).
    #[sea_orm(nullable)]
    pub total_records: Option<i64>,

    /// Download URL (when completed).
    #[sea_orm(nullable)]
    pub file_url: Option<String>,

    /// Generated file name (when completed).
    #[sea_orm(nullable)]
    pub file_name: Option<String>,

    /// Generated file size in bytes (when completed).
    #[sea_orm(nullable)]
    pub file_size: Option<i64>,

    /// Storage provider holding the file (when completed).
    #[sea_orm(nullable)]
    pub storage_provider: Option<String>,

    /// Error message if failed.
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,

    /// Actor who requested the export.
    #[sea_orm(indexed, nullable)]
    pub requested_by: Option<String>,

    /// When this job was created.
    pub created_at: DateTimeWithTimeZone,

    /// When this job was last updated.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,

    /// When this job reached a terminal status.
    #[sea_orm(nullable)]
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
