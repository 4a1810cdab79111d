//! Export job persistence seam.
//!
//! [`DataExportService`](super::DataExportService) talks to this trait so the
//! lifecycle logic is testable without a database.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use emporium_common::{AppError, AppResult};
use emporium_db::entities::export_job::{self, ExportStatus};
use emporium_db::repositories::ExportJobRepository;
use sea_orm::ActiveModelTrait;

/// Storage for export job rows.
#[async_trait]
pub trait ExportJobStore: Send + Sync {
    async fn insert(&self, job: export_job::Model) -> AppResult<export_job::Model>;

    async fn find(&self, id: &str) -> AppResult<Option<export_job::Model>>;

    /// Jobs for a resource, newest first.
    async fn list(
        &self,
        resource: &str,
        requested_by: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<export_job::Model>>;

    async fn count(&self, resource: &str, requested_by: Option<&str>) -> AppResult<u64>;

    /// Replace the stored row if its status is still `expected`, else `Conflict`.
    async fn update_if_status(
        &self,
        job: export_job::Model,
        expected: ExportStatus,
    ) -> AppResult<export_job::Model>;
}

#[async_trait]
impl ExportJobStore for ExportJobRepository {
    async fn insert(&self, job: export_job::Model) -> AppResult<export_job::Model> {
        self.create(export_job::ActiveModel::from(job).reset_all())
            .await
    }

    async fn find(&self, id: &str) -> AppResult<Option<export_job::Model>> {
        self.find_by_id(id).await
    }

    async fn list(
        &self,
        resource: &str,
        requested_by: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<export_job::Model>> {
        self.find_by_resource(resource, requested_by, limit, offset)
            .await
    }

    async fn count(&self, resource: &str, requested_by: Option<&str>) -> AppResult<u64> {
        self.count_by_resource(resource, requested_by).await
    }

    async fn update_if_status(
        &self,
        job: export_job::Model,
        expected: ExportStatus,
    ) -> AppResult<export_job::Model> {
        ExportJobRepository::update_if_status(self, job, expected).await
    }
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryExportJobStore {
    jobs: RwLock<HashMap<String, export_job::Model>>,
}

impl InMemoryExportJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(
        &self,
        resource: &str,
        requested_by: Option<&str>,
    ) -> AppResult<Vec<export_job::Model>> {
        let jobs = self.jobs.read().map_err(|_| lock_poisoned())?;

        let mut matching: Vec<_> = jobs
            .values()
            .filter(|job| job.resource == resource)
            .filter(|job| requested_by.is_none_or(|r| job.requested_by.as_deref() == Some(r)))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(matching)
    }
}

fn lock_poisoned() -> AppError {
    AppError::Internal("export job store lock poisoned".to_string())
}

#[async_trait]
impl ExportJobStore for InMemoryExportJobStore {
    async fn insert(&self, job: export_job::Model) -> AppResult<export_job::Model> {
        let mut jobs = self.jobs.write().map_err(|_| lock_poisoned())?;

        if jobs.contains_key(&job.id) {
            return Err(AppError::Conflict(format!(
                "Export job {} already exists",
                job.id
            )));
        }

        jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn find(&self, id: &str) -> AppResult<Option<export_job::Model>> {
        let jobs = self.jobs.read().map_err(|_| lock_poisoned())?;
        Ok(jobs.get(id).cloned())
    }

    async fn list(
        &self,
        resource: &str,
        requested_by: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<export_job::Model>> {
        Ok(self
            .matching(resource, requested_by)?
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, resource: &str, requested_by: Option<&str>) -> AppResult<u64> {
        Ok(self.matching(resource, requested_by)?.len() as u64)
    }

    async fn update_if_status(
        &self,
        job: export_job::Model,
        expected: ExportStatus,
    ) -> AppResult<export_job::Model> {
        let mut jobs = self.jobs.write().map_err(|_| lock_poisoned())?;

        let current = jobs
            .get(&job.id)
            .ok_or_else(|| AppError::NotFound(format!("Export job {} not found", job.id)))?;

        if current.status != expected {
            return Err(AppError::Conflict(format!(
                "Export job {} is no longer {}",
                job.id,
                expected.as_str()
            )));
        }

        jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }
}
