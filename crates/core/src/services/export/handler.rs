//! Resource export handler contract.
//!
//! A resource implements [`ResourceExporter`] with its own record type. Every
//! exporter is also an [`ExportHandler`], the object-safe form stored in the
//! registry and driven by the processor.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use emporium_common::{AppResult, ColumnPolicy, safe_file_name};
use emporium_db::entities::export_job::ExportFormat;
use serde::Serialize;
use serde_json::Value;

use super::columns::{self, ExportColumn, ExportRow};
use super::payload::{ExportFilters, ExportJobPayload, ExportOptions};

/// Page size used when the job options do not set a positive one.
pub const DEFAULT_PAGE_SIZE: u64 = 500;

/// One page request (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Zero-based offset of the first item on this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// One page of records with the total match count.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPage<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Per-resource export adapter.
#[async_trait]
pub trait ResourceExporter: Send + Sync + 'static {
    /// Domain record produced by [`fetch_page`](Self::fetch_page).
    type Record: Serialize + Send + Sync;

    /// Unique resource key (e.g. `products`).
    fn resource(&self) -> &str;

    /// Canonical, ordered columns.
    fn columns(&self) -> &[ExportColumn];

    fn default_page_size(&self) -> u64 {
        DEFAULT_PAGE_SIZE
    }

    fn supports_format(&self, format: ExportFormat) -> bool {
        matches!(format, ExportFormat::Csv | ExportFormat::Json)
    }

    /// Fetch one page. Ordering must be stable across calls with the same filters.
    async fn fetch_page(
        &self,
        page: PageRequest,
        filters: &ExportFilters,
    ) -> AppResult<ExportPage<Self::Record>>;

    /// Flatten one record into a row. Defaults to the record's serialized form.
    fn transform_record(&self, record: Self::Record) -> AppResult<ExportRow> {
        Ok(match serde_json::to_value(record)? {
            Value::Object(map) => map,
            other => {
                let mut row = ExportRow::new();
                row.insert("value".to_string(), other);
                row
            }
        })
    }

    fn file_name(&self, payload: &ExportJobPayload) -> String {
        default_file_name(self.resource(), payload.format, Utc::now())
    }
}

/// Object-safe handler interface used by the registry, runner and processor.
#[async_trait]
pub trait ExportHandler: Send + Sync {
    fn resource(&self) -> &str;

    fn columns(&self) -> &[ExportColumn];

    fn default_page_size(&self) -> u64;

    fn supports_format(&self, format: ExportFormat) -> bool;

    /// Output file name: the sanitised `options.fileName` when anything is left of it,
    /// else the handler's naming.
    fn build_file_name(&self, payload: &ExportJobPayload) -> String;

    /// Fetch one page and flatten every record.
    async fn fetch_rows(
        &self,
        page: PageRequest,
        filters: &ExportFilters,
    ) -> AppResult<ExportPage<ExportRow>>;

    fn resolve_columns(
        &self,
        requested: Option<&[ExportColumn]>,
        policy: ColumnPolicy,
    ) -> AppResult<Vec<ExportColumn>> {
        columns::resolve_columns(self.columns(), requested, policy)
    }

    fn resolve_page_size(&self, options: Option<&ExportOptions>) -> u64 {
        match options.and_then(|o| o.page_size) {
            Some(size) if size > 0 => size as u64,
            _ => self.default_page_size(),
        }
    }
}

#[async_trait]
impl<T: ResourceExporter> ExportHandler for T {
    fn resource(&self) -> &str {
        ResourceExporter::resource(self)
    }

    fn columns(&self) -> &[ExportColumn] {
        ResourceExporter::columns(self)
    }

    fn default_page_size(&self) -> u64 {
        ResourceExporter::default_page_size(self)
    }

    fn supports_format(&self, format: ExportFormat) -> bool {
        ResourceExporter::supports_format(self, format)
    }

    fn build_file_name(&self, payload: &ExportJobPayload) -> String {
        payload
            .options
            .as_ref()
            .and_then(|o| o.file_name.as_deref())
            .and_then(safe_file_name)
            .unwrap_or_else(|| self.file_name(payload))
    }

    async fn fetch_rows(
        &self,
        page: PageRequest,
        filters: &ExportFilters,
    ) -> AppResult<ExportPage<ExportRow>> {
        let ExportPage { items, total } = self.fetch_page(page, filters).await?;

        let items = items
            .into_iter()
            .map(|record| self.transform_record(record))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(ExportPage { items, total })
    }
}

/// `{resource}-export-{timestamp}.{ext}` with `:` and `.` in the timestamp replaced by `-`.
#[must_use]
pub fn default_file_name(resource: &str, format: ExportFormat, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{resource}-export-{stamp}.{}", format.extension())
}
