//! Export worker tests.
//!
//! Runs the worker function directly against in-memory collaborators, so no
//! Redis instance is needed.

use std::sync::Arc;

use apalis::prelude::{Data, Error};
use async_trait::async_trait;
use emporium_common::{AppError, AppResult, ColumnPolicy, IdGenerator, LocalStorage};
use emporium_core::{
    DataExportService, ExportColumn, ExportFilters, ExportHandlerRegistry, ExportJobPayload,
    ExportJobStore, ExportPage, ExportProcessor, InMemoryExportJobStore, PageRequest,
    RequestExportInput, ResourceExporter,
};
use emporium_db::entities::export_job::{self, ExportStatus};
use emporium_queue::{ExportMessage, ExportWorkerContext, export_worker};
use serde_json::{Value, json};

struct Brands {
    columns: Vec<ExportColumn>,
}

#[async_trait]
impl ResourceExporter for Brands {
    type Record = Value;

    fn resource(&self) -> &str {
        "brands"
    }

    fn columns(&self) -> &[ExportColumn] {
        &self.columns
    }

    async fn fetch_page(
        &self,
        page: PageRequest,
        _filters: &ExportFilters,
    ) -> AppResult<ExportPage<Value>> {
        let items = if page.page == 1 {
            vec![json!({ "id": "b1", "name": "Acme" })]
        } else {
            Vec::new()
        };
        Ok(ExportPage { items, total: 1 })
    }
}

/// Store whose status updates always fail with a database error.
#[derive(Default)]
struct ReadOnlyStore {
    inner: InMemoryExportJobStore,
}

#[async_trait]
impl ExportJobStore for ReadOnlyStore {
    async fn insert(&self, job: export_job::Model) -> AppResult<export_job::Model> {
        self.inner.insert(job).await
    }

    async fn find(&self, id: &str) -> AppResult<Option<export_job::Model>> {
        self.inner.find(id).await
    }

    async fn list(
        &self,
        resource: &str,
        requested_by: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<export_job::Model>> {
        self.inner.list(resource, requested_by, limit, offset).await
    }

    async fn count(&self, resource: &str, requested_by: Option<&str>) -> AppResult<u64> {
        self.inner.count(resource, requested_by).await
    }

    async fn update_if_status(
        &self,
        _job: export_job::Model,
        _expected: ExportStatus,
    ) -> AppResult<export_job::Model> {
        Err(AppError::Database("connection reset".to_string()))
    }
}

struct Setup {
    service: DataExportService,
    ctx: ExportWorkerContext,
    dir: std::path::PathBuf,
}

fn setup() -> Setup {
    let dir = std::env::temp_dir().join(format!("emporium-worker-{}", IdGenerator::new().generate()));
    setup_with(Arc::new(InMemoryExportJobStore::new()), dir)
}

fn setup_with(store: Arc<dyn ExportJobStore>, dir: std::path::PathBuf) -> Setup {
    let service = DataExportService::new(store);

    let mut registry = ExportHandlerRegistry::new();
    registry.register(Brands {
        columns: vec![ExportColumn::new("id", "ID"), ExportColumn::new("name", "Name")],
    });

    let storage = Arc::new(LocalStorage::new(dir.clone(), "/files".to_string()));

    let processor = ExportProcessor::new(
        service.clone(),
        Arc::new(registry),
        storage,
        ColumnPolicy::UseCanonical,
    );

    Setup {
        service,
        ctx: ExportWorkerContext::new(Arc::new(processor)),
        dir,
    }
}

async fn message_for(service: &DataExportService, resource: &str) -> ExportMessage {
    let job = service
        .request_export_job(RequestExportInput::new(resource))
        .await
        .unwrap();
    ExportMessage::generate(ExportJobPayload::from_job(&job).unwrap())
}

#[tokio::test]
async fn test_worker_completes_queued_export() {
    let setup = setup();
    let message = message_for(&setup.service, "brands").await;
    let job_id = message.payload.job_id.clone();

    export_worker(message, Data::new(setup.ctx.clone()))
        .await
        .unwrap();

    let job = setup.service.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ExportStatus::Completed);
    assert_eq!(job.total_records, Some(1));
    assert_eq!(job.storage_provider.as_deref(), Some("local"));

    let file_name = job.file_name.unwrap();
    let path = setup.dir.join(format!("exports/brands/{job_id}/{file_name}"));
    let csv = tokio::fs::read_to_string(path).await.unwrap();
    assert_eq!(csv, "ID,Name\nb1,Acme\n");

    let _ = tokio::fs::remove_dir_all(&setup.dir).await;
}

#[tokio::test]
async fn test_worker_marks_unknown_resource_failed() {
    let setup = setup();
    let message = message_for(&setup.service, "orders").await;
    let job_id = message.payload.job_id.clone();

    assert!(export_worker(message, Data::new(setup.ctx.clone())).await.is_err());

    let job = setup.service.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ExportStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("Unknown export resource: orders"));
}

#[tokio::test]
async fn test_worker_rejects_other_message_types() {
    let setup = setup();
    let mut message = message_for(&setup.service, "brands").await;
    message.kind = "export:purge".to_string();
    let job_id = message.payload.job_id.clone();

    assert!(export_worker(message, Data::new(setup.ctx.clone())).await.is_err());

    let job = setup.service.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ExportStatus::Pending);
}

#[tokio::test]
async fn test_worker_aborts_after_job_was_marked_failed() {
    // A regular file as the storage root makes every upload fail.
    let root = std::env::temp_dir().join(format!("emporium-worker-{}", IdGenerator::new().generate()));
    tokio::fs::write(&root, b"not a directory").await.unwrap();

    let setup = setup_with(Arc::new(InMemoryExportJobStore::new()), root.clone());
    let message = message_for(&setup.service, "brands").await;
    let job_id = message.payload.job_id.clone();

    let err = export_worker(message, Data::new(setup.ctx.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Abort(_)));

    let job = setup.service.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ExportStatus::Failed);
    assert!(job.error.unwrap().starts_with("Failed to create directory"));

    let _ = tokio::fs::remove_file(&root).await;
}

#[tokio::test]
async fn test_worker_retries_job_that_never_started() {
    let dir = std::env::temp_dir().join(format!("emporium-worker-{}", IdGenerator::new().generate()));
    let setup = setup_with(Arc::new(ReadOnlyStore::default()), dir);
    let message = message_for(&setup.service, "brands").await;
    let job_id = message.payload.job_id.clone();

    let err = export_worker(message, Data::new(setup.ctx.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Failed(_)));

    let job = setup.service.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ExportStatus::Pending);
}
