//! Data export service: the export job lifecycle.

use std::sync::Arc;

use chrono::Utc;
use emporium_common::{AppError, AppResult, get_metrics, id::IdGenerator};
use emporium_db::entities::export_job::{self, ExportFormat, ExportStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use validator::Validate;

use super::columns::ExportColumn;
use super::payload::ExportOptions;
use super::store::ExportJobStore;

/// Default number of jobs per listing page.
const DEFAULT_LIST_LIMIT: u64 = 20;

/// Maximum number of jobs per listing page.
const MAX_LIST_LIMIT: u64 = 100;

/// Input for requesting an export.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestExportInput {
    #[validate(length(min = 1, max = 64))]
    pub resource: String,
    /// `csv` (default) or `json`.
    pub format: Option<String>,
    /// Must be a JSON object when present.
    pub filters: Option<Value>,
    #[validate(length(max = 100))]
    pub columns: Option<Vec<ExportColumn>>,
    pub options: Option<ExportOptions>,
    #[validate(length(max = 64))]
    pub requested_by: Option<String>,
}

impl RequestExportInput {
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            format: None,
            filters: None,
            columns: None,
            options: None,
            requested_by: None,
        }
    }
}

/// Listing parameters. Out-of-range values are clamped, not rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub requested_by: Option<String>,
}

/// One page of export jobs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJobList {
    pub items: Vec<export_job::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Result metadata recorded on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedExport {
    pub total_records: u64,
    pub file_url: String,
    pub file_name: String,
    pub file_size: Option<u64>,
    pub storage_provider: Option<String>,
}

/// The only writer of export job rows.
#[derive(Clone)]
pub struct DataExportService {
    store: Arc<dyn ExportJobStore>,
    id_gen: IdGenerator,
}

impl DataExportService {
    /// Create a new data export service.
    #[must_use]
    pub fn new(store: Arc<dyn ExportJobStore>) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Persist a new pending job.
    pub async fn request_export_job(
        &self,
        input: RequestExportInput,
    ) -> AppResult<export_job::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let format = match input.format.as_deref() {
            None => ExportFormat::default(),
            Some(raw) => ExportFormat::parse(raw)
                .ok_or_else(|| AppError::UnsupportedFormat(raw.to_string()))?,
        };

        let filters = match input.filters {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(Value::Object(map)) => Value::Object(map),
            Some(_) => {
                return Err(AppError::Validation(
                    "filters must be a JSON object".to_string(),
                ));
            }
        };

        let columns = input.columns.map(serde_json::to_value).transpose()?;
        let options = input.options.map(serde_json::to_value).transpose()?;

        let job = export_job::Model {
            id: self.id_gen.generate(),
            resource: input.resource.trim().to_string(),
            format,
            status: ExportStatus::Pending,
            filters,
            columns,
            options,
            total_records: None,
            file_url: None,
            file_name: None,
            file_size: None,
            storage_provider: None,
            error: None,
            requested_by: input.requested_by,
            created_at: Utc::now().into(),
            updated_at: None,
            completed_at: None,
        };

        let job = self.store.insert(job).await?;
        get_metrics().record_requested();

        info!(
            job_id = %job.id,
            resource = %job.resource,
            format = job.format.extension(),
            "Export job requested"
        );

        Ok(job)
    }

    pub async fn get_job(&self, id: &str) -> AppResult<Option<export_job::Model>> {
        self.store.find(id).await
    }

    /// List jobs for a resource, newest first.
    pub async fn list_jobs(&self, resource: &str, query: ListJobsQuery) -> AppResult<ExportJobList> {
        let limit = query
            .limit
            .map_or(DEFAULT_LIST_LIMIT, |l| l.clamp(1, MAX_LIST_LIMIT as i64) as u64);
        let page = query.page.map_or(1, |p| p.max(1) as u64);
        let requested_by = query.requested_by.as_deref();

        // Pages past the end yield no items; the offset stays within SQL range.
        let offset = (page - 1).saturating_mul(limit).min(i64::MAX as u64);

        let total = self.store.count(resource, requested_by).await?;
        let items = self
            .store
            .list(resource, requested_by, limit, offset)
            .await?;

        Ok(ExportJobList {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        })
    }

    /// pending → processing. Clears any previous error.
    pub async fn mark_processing(&self, id: &str) -> AppResult<export_job::Model> {
        self.transition(id, ExportStatus::Processing, |job| {
            job.error = None;
        })
        .await
    }

    /// processing → completed, recording the file metadata.
    pub async fn mark_completed(
        &self,
        id: &str,
        result: CompletedExport,
    ) -> AppResult<export_job::Model> {
        self.transition(id, ExportStatus::Completed, |job| {
            job.total_records = Some(result.total_records as i64);
            job.file_url = Some(result.file_url);
            job.file_name = Some(result.file_name);
            job.file_size = result.file_size.map(|s| s as i64);
            job.storage_provider = result.storage_provider;
            job.completed_at = Some(Utc::now().into());
        })
        .await
    }

    /// processing → failed, recording the error message.
    pub async fn mark_failed(&self, id: &str, error: &str) -> AppResult<export_job::Model> {
        self.transition(id, ExportStatus::Failed, |job| {
            job.error = Some(error.to_string());
            job.completed_at = Some(Utc::now().into());
        })
        .await
    }

    async fn transition(
        &self,
        id: &str,
        next: ExportStatus,
        apply: impl FnOnce(&mut export_job::Model) + Send,
    ) -> AppResult<export_job::Model> {
        let mut job = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Export job {id} not found")))?;

        let current = job.status;
        if !current.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Export job {id} cannot move from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }

        job.status = next;
        job.updated_at = Some(Utc::now().into());
        apply(&mut job);

        debug!(job_id = %id, from = current.as_str(), to = next.as_str(), "Export job transition");

        self.store.update_if_status(job, current).await
    }
}
