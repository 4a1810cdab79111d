//! Export job repository.

use std::sync::Arc;

use crate::entities::{ExportJob, export_job};
use emporium_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select,
};

use crate::entities::export_job::ExportStatus;

/// Export job repository for database operations.
#[derive(Clone)]
pub struct ExportJobRepository {
    db: Arc<DatabaseConnection>,
}

impl ExportJobRepository {
    /// Create a new export job repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an export job by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<export_job::Model>> {
        ExportJob::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find export jobs for a resource, newest first.
    pub async fn find_by_resource(
        &self,
        resource: &str,
        requested_by: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<export_job::Model>> {
        Self::resource_query(resource, requested_by)
            .order_by_desc(export_job::Column::CreatedAt)
            .order_by_desc(export_job::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count export jobs for a resource.
    pub async fn count_by_resource(
        &self,
        resource: &str,
        requested_by: Option<&str>,
    ) -> AppResult<u64> {
        Self::resource_query(resource, requested_by)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new export job.
    pub async fn create(&self, model: export_job::ActiveModel) -> AppResult<export_job::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Write `model` only if the stored row still has status `expected`.
    ///
    /// Returns `Conflict` when another writer moved the job first.
    pub async fn update_if_status(
        &self,
        model: export_job::Model,
        expected: ExportStatus,
    ) -> AppResult<export_job::Model> {
        let id = model.id.clone();
        let active = export_job::ActiveModel::from(model).reset_all();

        ExportJob::update(active)
            .filter(export_job::Column::Status.eq(expected))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated => AppError::Conflict(format!(
                    "Export job {id} is no longer {}",
                    expected.as_str()
                )),
                other => AppError::Database(other.to_string()),
            })
    }

    fn resource_query(resource: &str, requested_by: Option<&str>) -> Select<ExportJob> {
        let mut query = ExportJob::find().filter(export_job::Column::Resource.eq(resource));
        if let Some(requested_by) = requested_by {
            query = query.filter(export_job::Column::RequestedBy.eq(requested_by));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::export_job::ExportFormat;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait, Set};

    fn create_test_job(id: &str, status: ExportStatus) -> export_job::Model {
        export_job::Model {
            id: id.to_string(),
            resource: "products".to_string(),
            format: ExportFormat::Csv,
            status,
            filters: serde_json::json!({}),
            columns: None,
            options: None,
            total_records: None,
            file_url: None,
            file_name: None,
            file_size: None,
            storage_provider: None,
            error: None,
            requested_by: Some("admin1".to_string()),
            created_at: Utc::now().into(),
            updated_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let job = create_test_job("job1", ExportStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[job.clone()]])
                .into_connection(),
        );

        let repo = ExportJobRepository::new(db);
        let result = repo.find_by_id("job1").await.unwrap();

        assert_eq!(result.unwrap().resource, "products");
    }

    #[tokio::test]
    async fn test_find_by_id_missing_returns_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<export_job::Model>::new()])
                .into_connection(),
        );

        let repo = ExportJobRepository::new(db);
        let result = repo.find_by_id("missing").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_create_job() {
        let job = create_test_job("job1", ExportStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[job.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = ExportJobRepository::new(db);
        let active = export_job::ActiveModel {
            id: Set("job1".to_string()),
            resource: Set("products".to_string()),
            format: Set(ExportFormat::Csv),
            status: Set(ExportStatus::Pending),
            filters: Set(serde_json::json!({})),
            ..Default::default()
        };

        let created = repo.create(active).await.unwrap();
        assert_eq!(created.status, ExportStatus::Pending);
    }

    #[tokio::test]
    async fn test_count_by_resource() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(7)),
                }]])
                .into_connection(),
        );

        let repo = ExportJobRepository::new(db);
        let count = repo.count_by_resource("products", None).await.unwrap();

        assert_eq!(count, 7);
    }

    #[tokio::test]
    async fn test_update_if_status_conflict_when_no_row_matches() {
        let job = create_test_job("job1", ExportStatus::Processing);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<export_job::Model>::new()])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = ExportJobRepository::new(db);
        let result = repo.update_if_status(job, ExportStatus::Pending).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_resource_query_filters_requester() {
        let sql = ExportJobRepository::resource_query("users", Some("admin1"))
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""export_job"."resource" = 'users'"#));
        assert!(sql.contains(r#""export_job"."requested_by" = 'admin1'"#));
    }
}
