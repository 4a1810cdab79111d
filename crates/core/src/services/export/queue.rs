//! Export queue seam.
//!
//! Lets the runner publish export payloads without depending on the broker
//! client. The Redis implementation lives in the queue crate.

use async_trait::async_trait;
use emporium_common::AppResult;
use emporium_db::entities::export_job;

use super::payload::ExportJobPayload;

/// Logical queue export payloads are published to.
pub const EXPORT_QUEUE: &str = "export";

/// Message type tag of an export payload.
pub const EXPORT_MESSAGE_TYPE: &str = "export:generate";

/// Publishes export payloads for asynchronous processing.
#[async_trait]
pub trait ExportQueue: Send + Sync {
    /// Publish one payload. Connection and publish failures are returned as-is.
    async fn enqueue_payload(&self, payload: &ExportJobPayload) -> AppResult<()>;

    /// Publish the payload for a persisted job.
    async fn enqueue(&self, job: &export_job::Model) -> AppResult<()> {
        let payload = ExportJobPayload::from_job(job)?;
        self.enqueue_payload(&payload).await
    }
}
