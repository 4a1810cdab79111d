//! Export worker.

use std::sync::Arc;

use apalis::prelude::*;
use emporium_common::AppError;
use emporium_core::ExportProcessor;
use tracing::{error, info, warn};

use crate::jobs::ExportMessage;

/// Context for the export worker.
#[derive(Clone)]
pub struct ExportWorkerContext {
    pub processor: Arc<ExportProcessor>,
}

impl ExportWorkerContext {
    /// Create a new export worker context.
    #[must_use]
    pub const fn new(processor: Arc<ExportProcessor>) -> Self {
        Self { processor }
    }
}

/// Worker function for export messages.
///
/// # Errors
/// Returns an error if the message is not an export request or the export fails.
/// Only retryable errors raised before the job left `pending` are handed back for
/// another attempt; everything else aborts.
pub async fn export_worker(
    message: ExportMessage,
    ctx: Data<ExportWorkerContext>,
) -> Result<(), Error> {
    if !message.is_generate() {
        warn!(kind = %message.kind, "Ignoring message with unexpected type");
        return Err(abort(AppError::Validation(format!(
            "Unexpected export message type: {}",
            message.kind
        ))));
    }

    let payload = &message.payload;
    info!(
        job_id = %payload.job_id,
        resource = %payload.resource,
        "Processing queued export"
    );

    match ctx.processor.process(payload).await {
        Ok(summary) => {
            info!(
                job_id = %summary.job_id,
                total_records = summary.total_records,
                "Queued export completed"
            );
            Ok(())
        }
        Err(e) => {
            error!(job_id = %payload.job_id, error = %e, "Queued export failed");

            // A job that left pending has been marked failed; another attempt
            // could only conflict. An unreadable status counts as pending.
            let pending = ctx.processor.is_pending(&payload.job_id).await.unwrap_or(true);
            if e.is_retryable() && pending {
                let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
                Err(Error::Failed(boxed.into()))
            } else {
                Err(abort(e))
            }
        }
    }
}

fn abort(e: AppError) -> Error {
    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
    Error::Abort(boxed.into())
}
