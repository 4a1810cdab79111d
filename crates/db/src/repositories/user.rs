//! User repository.

use std::sync::Arc;

use crate::entities::{User, UserProfile, user, user_profile};
use chrono::{DateTime, Utc};
use emporium_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, SelectTwo,
};

/// Typed user filter used by account exports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserExportFilter {
    /// Substring matched against email or username.
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// A user joined with the optional profile row.
#[derive(Debug, Clone)]
pub struct UserExportRecord {
    pub user: user::Model,
    pub profile: Option<user_profile::Model>,
}

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one page of the export (1-indexed) with the total match count.
    pub async fn find_export_page(
        &self,
        filter: &UserExportFilter,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<UserExportRecord>, u64)> {
        let paginator = Self::export_query(filter).paginate(self.db.as_ref(), limit.max(1));

        let total = paginator
            .num_items()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let records = rows
            .into_iter()
            .map(|(user, profile)| UserExportRecord { user, profile })
            .collect();

        Ok((records, total))
    }

    fn export_query(filter: &UserExportFilter) -> SelectTwo<User, UserProfile> {
        let mut query = User::find().find_also_related(UserProfile);

        if let Some(search) = &filter.search {
            query = query.filter(
                Condition::any()
                    .add(user::Column::Email.contains(search))
                    .add(user::Column::Username.contains(search)),
            );
        }

        if let Some(is_active) = filter.is_active {
            query = query.filter(user::Column::IsActive.eq(is_active));
        }

        if let Some(from) = filter.created_from {
            query = query.filter(user::Column::CreatedAt.gte(from));
        }

        if let Some(to) = filter.created_to {
            query = query.filter(user::Column::CreatedAt.lte(to));
        }

        query
            .order_by_desc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait};

    #[test]
    fn test_export_query_joins_profile() {
        let filter = UserExportFilter {
            search: Some("alice".to_string()),
            is_active: Some(false),
            ..Default::default()
        };

        let sql = UserRepository::export_query(&filter)
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#"LEFT JOIN "user_profile""#));
        assert!(sql.contains(r#""user"."email" LIKE '%alice%'"#));
        assert!(sql.contains(r#""user"."is_active" = FALSE"#));
        assert!(sql.contains(r#"ORDER BY "user"."created_at" DESC, "user"."id" ASC"#));
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }
}
