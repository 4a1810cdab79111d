//! Redis-backed export queue publisher.
//!
//! Pushes `export:generate` messages onto the apalis Redis storage consumed by
//! the export worker.

use apalis_redis::RedisStorage;
use async_trait::async_trait;
use emporium_common::{AppError, AppResult, RedisConfig};
use emporium_core::{EXPORT_QUEUE, ExportJobPayload, ExportQueue};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::jobs::ExportMessage;

/// Redis export queue publisher.
///
/// The connection is opened on first use and reused until [`close`](Self::close).
pub struct RedisExportQueue {
    config: RedisConfig,
    namespace: String,
    storage: Mutex<Option<RedisStorage<ExportMessage>>>,
}

impl RedisExportQueue {
    /// Create a publisher. Nothing is connected until the first publish.
    #[must_use]
    pub fn new(config: RedisConfig) -> Self {
        let namespace = config.queue_name(EXPORT_QUEUE);
        Self {
            config,
            namespace,
            storage: Mutex::new(None),
        }
    }

    /// Queue name the messages are pushed to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The storage for the export queue, connecting if needed.
    ///
    /// Also used to attach the export worker to the same queue.
    pub async fn storage(&self) -> AppResult<RedisStorage<ExportMessage>> {
        let mut guard = self.storage.lock().await;

        if let Some(storage) = guard.as_ref() {
            return Ok(storage.clone());
        }

        let client = redis::Client::open(self.config.connection_url().as_str())
            .map_err(|e| AppError::Queue(format!("Invalid Redis URL: {e}")))?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to connect to Redis: {e}")))?;

        let storage = RedisStorage::new_with_config(
            conn,
            apalis_redis::Config::default().set_namespace(&self.namespace),
        );
        info!(queue = %self.namespace, "Connected export queue");

        *guard = Some(storage.clone());
        Ok(storage)
    }

    /// Whether a connection is currently open.
    pub async fn is_connected(&self) -> bool {
        self.storage.lock().await.is_some()
    }

    /// Drop the open connection, if any.
    pub async fn close(&self) {
        if self.storage.lock().await.take().is_some() {
            info!(queue = %self.namespace, "Closed export queue connection");
        }
    }
}

#[async_trait]
impl ExportQueue for RedisExportQueue {
    async fn enqueue_payload(&self, payload: &ExportJobPayload) -> AppResult<()> {
        use apalis::prelude::*;

        let mut storage = self.storage().await?;

        storage
            .push(ExportMessage::generate(payload.clone()))
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue export: {e}")))?;

        debug!(
            job_id = %payload.job_id,
            resource = %payload.resource,
            queue = %self.namespace,
            "Queued export job"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vhost: Option<&str>) -> RedisConfig {
        RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            username: None,
            password: None,
            vhost: vhost.map(ToString::to_string),
        }
    }

    #[test]
    fn test_namespace_follows_vhost() {
        assert_eq!(RedisExportQueue::new(config(None)).namespace(), "export");
        assert_eq!(
            RedisExportQueue::new(config(Some("/shop/"))).namespace(),
            "shop:export"
        );
    }

    #[tokio::test]
    async fn test_not_connected_until_first_use() {
        let queue = RedisExportQueue::new(config(None));
        assert!(!queue.is_connected().await);
        queue.close().await;
        assert!(!queue.is_connected().await);
    }

    #[tokio::test]
    async fn test_invalid_url_is_queue_error() {
        let mut cfg = config(None);
        cfg.url = "not a url".to_string();
        let queue = RedisExportQueue::new(cfg);

        let payload = ExportJobPayload {
            job_id: "job1".to_string(),
            resource: "products".to_string(),
            format: Default::default(),
            filters: None,
            columns: None,
            options: None,
            requested_by: None,
        };

        let err = queue.enqueue_payload(&payload).await.unwrap_err();
        assert!(matches!(err, AppError::Queue(_)));
        assert!(!queue.is_connected().await);
    }
}
