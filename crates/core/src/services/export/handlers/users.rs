//! Customer account export handler.

use async_trait::async_trait;
use emporium_common::AppResult;
use emporium_db::repositories::{UserExportFilter, UserExportRecord, UserRepository};
use serde::Serialize;
use serde_json::{Value, json};

use crate::services::export::columns::{ExportColumn, ExportRow};
use crate::services::export::handler::{ExportPage, PageRequest, ResourceExporter};
use crate::services::export::payload::ExportFilters;

pub const USERS_RESOURCE: &str = "users";

/// Exports user accounts; profile fields are nested and reached via column paths.
pub struct UsersExportHandler {
    repo: UserRepository,
    columns: Vec<ExportColumn>,
}

impl UsersExportHandler {
    #[must_use]
    pub fn new(repo: UserRepository) -> Self {
        Self {
            repo,
            columns: vec![
                ExportColumn::new("id", "ID"),
                ExportColumn::new("email", "Email"),
                ExportColumn::new("username", "Username"),
                ExportColumn::new("isActive", "Active"),
                ExportColumn::new("firstName", "First Name").with_path("profile.firstName"),
                ExportColumn::new("lastName", "Last Name").with_path("profile.lastName"),
                ExportColumn::new("phone", "Phone").with_path("profile.phone"),
                ExportColumn::new("country", "Country").with_path("profile.country"),
                ExportColumn::new("createdAt", "Created At").with_formatter("datetime"),
            ],
        }
    }
}

pub struct UserRecord(pub UserExportRecord);

impl Serialize for UserRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::Object(user_row(&self.0)).serialize(serializer)
    }
}

#[async_trait]
impl ResourceExporter for UsersExportHandler {
    type Record = UserRecord;

    fn resource(&self) -> &str {
        USERS_RESOURCE
    }

    fn columns(&self) -> &[ExportColumn] {
        &self.columns
    }

    async fn fetch_page(
        &self,
        page: PageRequest,
        filters: &ExportFilters,
    ) -> AppResult<ExportPage<UserRecord>> {
        let filter = UserExportFilter {
            search: filters.string("search"),
            is_active: filters.bool("isActive"),
            created_from: filters.datetime("createdFrom"),
            created_to: filters.datetime("createdTo"),
        };

        let (records, total) = self
            .repo
            .find_export_page(&filter, page.page, page.limit)
            .await?;

        Ok(ExportPage {
            items: records.into_iter().map(UserRecord).collect(),
            total,
        })
    }

    fn transform_record(&self, record: UserRecord) -> AppResult<ExportRow> {
        Ok(user_row(&record.0))
    }
}

#[must_use]
pub fn user_row(record: &UserExportRecord) -> ExportRow {
    let user = &record.user;
    let profile = record.profile.as_ref().map(|p| {
        json!({
            "firstName": p.first_name,
            "lastName": p.last_name,
            "phone": p.phone,
            "country": p.country,
        })
    });

    let row = json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
        "isActive": user.is_active,
        "createdAt": user.created_at.to_rfc3339(),
        "profile": profile,
    });

    match row {
        Value::Object(map) => map,
        _ => ExportRow::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::export::columns::project_row;
    use chrono::Utc;
    use emporium_db::entities::{user, user_profile};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn record(profile: Option<user_profile::Model>) -> UserExportRecord {
        UserExportRecord {
            user: user::Model {
                id: "u1".to_string(),
                email: "ada@example.com".to_string(),
                username: "ada".to_string(),
                is_active: true,
                created_at: Utc::now().into(),
                updated_at: None,
            },
            profile,
        }
    }

    fn handler() -> UsersExportHandler {
        UsersExportHandler::new(UserRepository::new(Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        )))
    }

    #[test]
    fn test_profile_columns_resolve_through_path() {
        let row = user_row(&record(Some(user_profile::Model {
            user_id: "u1".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            phone: None,
            country: Some("GB".to_string()),
        })));

        let values = project_row(&row, handler().columns());
        assert_eq!(values[1], json!("ada@example.com"));
        assert_eq!(values[4], json!("Ada"));
        assert_eq!(values[5], json!("Lovelace"));
        assert_eq!(values[6], Value::Null);
        assert_eq!(values[7], json!("GB"));
    }

    #[test]
    fn test_missing_profile_yields_nulls() {
        let row = user_row(&record(None));
        let values = project_row(&row, handler().columns());

        assert_eq!(values[4], Value::Null);
        assert_eq!(values[7], Value::Null);
    }
}
