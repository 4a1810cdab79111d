//! Export processor: drives a handler through the paged fetch/transform/write
//! cycle and records the outcome on the job.

use std::sync::Arc;

use emporium_common::{
    AppError, AppResult, ColumnPolicy, StorageBackend, Timer, export_storage_key, get_metrics,
};
use emporium_db::entities::export_job::ExportStatus;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::columns::project_row;
use super::handler::{ExportHandler, PageRequest};
use super::payload::ExportJobPayload;
use super::registry::ExportHandlerRegistry;
use super::service::{CompletedExport, DataExportService};
use super::writer::writer_for;

/// Outcome of a finished export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub job_id: String,
    pub total_records: u64,
    pub file_name: String,
    pub file_url: String,
    pub file_size: u64,
}

#[derive(Clone)]
pub struct ExportProcessor {
    service: DataExportService,
    registry: Arc<ExportHandlerRegistry>,
    storage: Arc<dyn StorageBackend>,
    column_policy: ColumnPolicy,
}

impl ExportProcessor {
    #[must_use]
    pub fn new(
        service: DataExportService,
        registry: Arc<ExportHandlerRegistry>,
        storage: Arc<dyn StorageBackend>,
        column_policy: ColumnPolicy,
    ) -> Self {
        Self {
            service,
            registry,
            storage,
            column_policy,
        }
    }

    /// Run one export job to a terminal status.
    ///
    /// Once the job is marked processing, every failure marks it failed with the
    /// error message before the error is returned.
    pub async fn process(&self, payload: &ExportJobPayload) -> AppResult<ExportSummary> {
        let timer = Timer::start();

        self.service.mark_processing(&payload.job_id).await?;

        info!(
            job_id = %payload.job_id,
            resource = %payload.resource,
            format = payload.format.extension(),
            "Export started"
        );

        match self.generate(payload).await {
            Ok(summary) => {
                get_metrics().record_finished(true, summary.total_records, timer.elapsed());
                info!(
                    job_id = %summary.job_id,
                    total_records = summary.total_records,
                    file_size = summary.file_size,
                    elapsed_ms = timer.elapsed().as_millis() as u64,
                    "Export completed"
                );
                Ok(summary)
            }
            Err(err) => {
                get_metrics().record_finished(false, 0, timer.elapsed());
                warn!(job_id = %payload.job_id, error = %err, "Export failed");

                if let Err(mark_err) = self
                    .service
                    .mark_failed(&payload.job_id, &err.to_string())
                    .await
                {
                    error!(
                        job_id = %payload.job_id,
                        error = %mark_err,
                        "Failed to record export failure"
                    );
                }

                Err(err)
            }
        }
    }

    async fn generate(&self, payload: &ExportJobPayload) -> AppResult<ExportSummary> {
        let handler = self
            .registry
            .get(&payload.resource)
            .ok_or_else(|| AppError::UnknownResource(payload.resource.clone()))?;

        if !handler.supports_format(payload.format) {
            return Err(AppError::UnsupportedFormat(
                payload.format.extension().to_string(),
            ));
        }

        let columns = handler.resolve_columns(payload.columns.as_deref(), self.column_policy)?;
        let limit = handler.resolve_page_size(payload.options.as_ref());
        let filters = payload.filters();

        let mut writer = writer_for(payload.format, &columns);
        let mut page = 1;

        loop {
            let batch = handler
                .fetch_rows(PageRequest { page, limit }, &filters)
                .await?;

            if batch.items.is_empty() {
                break;
            }

            for row in &batch.items {
                writer.write_row(project_row(row, &columns))?;
            }

            debug!(
                job_id = %payload.job_id,
                page,
                written = writer.rows_written(),
                total = batch.total,
                "Export page written"
            );

            if writer.rows_written() >= batch.total {
                break;
            }
            page += 1;
        }

        let total_records = writer.rows_written();
        let bytes = writer.finish()?;

        let file_name = handler.build_file_name(payload);
        let key = export_storage_key(&payload.resource, &payload.job_id, &file_name);
        let uploaded = self
            .storage
            .upload(&key, &bytes, payload.format.content_type())
            .await?;

        self.service
            .mark_completed(
                &payload.job_id,
                CompletedExport {
                    total_records,
                    file_url: uploaded.url.clone(),
                    file_name: file_name.clone(),
                    file_size: Some(uploaded.size),
                    storage_provider: Some(self.storage.provider().to_string()),
                },
            )
            .await?;

        Ok(ExportSummary {
            job_id: payload.job_id.clone(),
            total_records,
            file_name,
            file_url: uploaded.url,
            file_size: uploaded.size,
        })
    }

    #[must_use]
    pub fn handler(&self, resource: &str) -> Option<Arc<dyn ExportHandler>> {
        self.registry.get(resource)
    }

    /// Whether the job is still waiting to be picked up.
    pub async fn is_pending(&self, job_id: &str) -> AppResult<bool> {
        Ok(self
            .service
            .get_job(job_id)
            .await?
            .is_some_and(|job| job.status == ExportStatus::Pending))
    }
}
