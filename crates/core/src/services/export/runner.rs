//! Export job runner: picks direct or queued execution for one request.

use std::sync::Arc;

use emporium_common::{AppError, AppResult, ExecutionMode, get_metrics};
use serde::Serialize;
use tracing::info;

use super::payload::ExportJobPayload;
use super::processor::{ExportProcessor, ExportSummary};
use super::queue::ExportQueue;

/// What `run` did with the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RunOutcome {
    /// Published; a worker will process it later.
    Queued,
    /// Processed in-process to a terminal status.
    Processed(ExportSummary),
}

#[derive(Clone)]
pub struct ExportJobRunner {
    mode: ExecutionMode,
    processor: Arc<ExportProcessor>,
    queue: Arc<dyn ExportQueue>,
}

impl ExportJobRunner {
    #[must_use]
    pub fn new(
        mode: ExecutionMode,
        processor: Arc<ExportProcessor>,
        queue: Arc<dyn ExportQueue>,
    ) -> Self {
        Self {
            mode,
            processor,
            queue,
        }
    }

    /// Run an export in the overriding mode, or the configured one.
    ///
    /// The resource must be registered and support the format; otherwise the
    /// error is returned before anything is published or processed. Job status
    /// is left to the processor.
    pub async fn run(
        &self,
        payload: &ExportJobPayload,
        override_mode: Option<ExecutionMode>,
    ) -> AppResult<RunOutcome> {
        let mode = override_mode.unwrap_or(self.mode);

        let handler = self
            .processor
            .handler(&payload.resource)
            .ok_or_else(|| AppError::UnknownResource(payload.resource.clone()))?;
        if !handler.supports_format(payload.format) {
            return Err(AppError::UnsupportedFormat(
                payload.format.extension().to_string(),
            ));
        }

        info!(
            job_id = %payload.job_id,
            resource = %payload.resource,
            mode = mode.as_str(),
            "Running export"
        );

        match mode {
            ExecutionMode::Queue => {
                self.queue.enqueue_payload(payload).await?;
                get_metrics().record_queued();
                Ok(RunOutcome::Queued)
            }
            ExecutionMode::Direct => self
                .processor
                .process(payload)
                .await
                .map(RunOutcome::Processed),
        }
    }
}
