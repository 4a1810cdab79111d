//! Create export_job table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExportJob::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ExportJob::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(ExportJob::Resource).string_len(64).not_null())
                    .col(
                        ColumnDef::new(ExportJob::Format)
                            .string_len(16)
                            .not_null()
                            .default("csv"),
                    )
                    .col(
                        ColumnDef::new(ExportJob::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ExportJob::Filters)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(ColumnDef::new(ExportJob::Columns).json_binary())
                    .col(ColumnDef::new(ExportJob::Options).json_binary())
                    .col(ColumnDef::new(ExportJob::TotalRecords).big_integer())
                    .col(ColumnDef::new(ExportJob::FileUrl).string_len(2048))
                    .col(ColumnDef::new(ExportJob::FileName).string_len(512))
                    .col(ColumnDef::new(ExportJob::FileSize).big_integer())
                    .col(ColumnDef::new(ExportJob::StorageProvider).string_len(32))
                    .col(ColumnDef::new(ExportJob::Error).text())
                    .col(ColumnDef::new(ExportJob::RequestedBy).string_len(64))
                    .col(
                        ColumnDef::new(ExportJob::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ExportJob::UpdatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ExportJob::CompletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Listing: WHERE resource = ? [AND requested_by = ?] ORDER BY created_at DESC
        manager
            .create_index(
                Index::create()
                    .name("idx_export_job_resource_created_at")
                    .table(ExportJob::Table)
                    .col(ExportJob::Resource)
                    .col(ExportJob::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_export_job_requested_by")
                    .table(ExportJob::Table)
                    .col(ExportJob::RequestedBy)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExportJob::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ExportJob {
    Table,
    Id,
    Resource,
    Format,
    Status,
    Filters,
    Columns,
    Options,
    TotalRecords,
    FileUrl,
    FileName,
    FileSize,
    StorageProvider,
    Error,
    RequestedBy,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}
