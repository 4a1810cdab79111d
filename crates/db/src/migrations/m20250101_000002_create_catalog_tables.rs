//! Create brand, category, product, product_variant and product_category tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Brand::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Brand::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Brand::Name).string_len(256).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Category::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Category::Name).string_len(256).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Product::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Product::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Product::Name).string_len(512).not_null())
                    .col(ColumnDef::new(Product::Sku).string_len(128).unique_key())
                    .col(ColumnDef::new(Product::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Product::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(Product::IsFeatured).boolean().not_null().default(false))
                    .col(ColumnDef::new(Product::BrandId).string_len(32))
                    .col(
                        ColumnDef::new(Product::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Product::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Product::Table, Product::BrandId)
                            .to(Brand::Table, Brand::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Export paging orders by (created_at DESC, id)
        manager
            .create_index(
                Index::create()
                    .name("idx_product_created_at_id")
                    .table(Product::Table)
                    .col(Product::CreatedAt)
                    .col(Product::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_brand_id")
                    .table(Product::Table)
                    .col(Product::BrandId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductVariant::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductVariant::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductVariant::ProductId).string_len(32).not_null())
                    .col(ColumnDef::new(ProductVariant::Sku).string_len(128))
                    .col(ColumnDef::new(ProductVariant::Price).double().not_null())
                    .col(
                        ColumnDef::new(ProductVariant::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ProductVariant::Table, ProductVariant::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_variant_product_id")
                    .table(ProductVariant::Table)
                    .col(ProductVariant::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductCategory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProductCategory::ProductId).string_len(32).not_null())
                    .col(ColumnDef::new(ProductCategory::CategoryId).string_len(32).not_null())
                    .primary_key(
                        Index::create()
                            .col(ProductCategory::ProductId)
                            .col(ProductCategory::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ProductCategory::Table, ProductCategory::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ProductCategory::Table, ProductCategory::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductCategory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductVariant::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Product::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Brand::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Brand {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Category {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Product {
    Table,
    Id,
    Name,
    Sku,
    Status,
    IsActive,
    IsFeatured,
    BrandId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProductVariant {
    Table,
    Id,
    ProductId,
    Sku,
    Price,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProductCategory {
    Table,
    ProductId,
    CategoryId,
}
