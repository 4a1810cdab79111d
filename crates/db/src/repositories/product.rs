//! Product repository.

use std::sync::Arc;

use crate::entities::product::ProductStatus;
use crate::entities::{
    Brand, Category, Product, ProductCategory, ProductVariant, brand, category, product,
    product_category, product_variant,
};
use chrono::{DateTime, Utc};
use emporium_common::{AppError, AppResult};
use sea_orm::sea_query::Query;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, LoaderTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select,
};

/// Typed product filter used by catalog exports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductExportFilter {
    /// Substring matched against name or SKU.
    pub search: Option<String>,
    pub statuses: Vec<ProductStatus>,
    pub brand_ids: Vec<String>,
    /// Products in any of these categories.
    pub category_ids: Vec<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    /// Products with at least one variant priced at or above this value.
    pub min_price: Option<f64>,
    /// Products with at least one variant priced at or below this value.
    pub max_price: Option<f64>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// A product with the relations an export row needs.
#[derive(Debug, Clone)]
pub struct ProductExportRecord {
    pub product: product::Model,
    pub variants: Vec<product_variant::Model>,
    pub brand: Option<brand::Model>,
    pub categories: Vec<category::Model>,
}

/// Product repository for database operations.
#[derive(Clone)]
pub struct ProductRepository {
    db: Arc<DatabaseConnection>,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a product by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<product::Model>> {
        Product::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one page of the export (1-indexed) with the total match count.
    ///
    /// Rows are ordered newest first with the id as tie breaker, so consecutive pages
    /// never overlap while the data is unchanged.
    pub async fn find_export_page(
        &self,
        filter: &ProductExportFilter,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<ProductExportRecord>, u64)> {
        let db = self.db.as_ref();
        let paginator = Self::export_query(filter).paginate(db, limit.max(1));

        let total = paginator
            .num_items()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let products = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if products.is_empty() {
            return Ok((Vec::new(), total));
        }

        let variants = products
            .load_many(ProductVariant, db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let brands = products
            .load_one(Brand, db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let categories = products
            .load_many_to_many(Category, ProductCategory, db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let records = products
            .into_iter()
            .zip(variants)
            .zip(brands)
            .zip(categories)
            .map(|(((product, variants), brand), categories)| ProductExportRecord {
                product,
                variants,
                brand,
                categories,
            })
            .collect();

        Ok((records, total))
    }

    fn export_query(filter: &ProductExportFilter) -> Select<Product> {
        let mut query = Product::find();

        if let Some(search) = &filter.search {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(search))
                    .add(product::Column::Sku.contains(search)),
            );
        }

        if !filter.statuses.is_empty() {
            query = query.filter(product::Column::Status.is_in(filter.statuses.clone()));
        }

        if !filter.brand_ids.is_empty() {
            query = query.filter(product::Column::BrandId.is_in(filter.brand_ids.clone()));
        }

        if !filter.category_ids.is_empty() {
            query = query.filter(
                product::Column::Id.in_subquery(
                    Query::select()
                        .column(product_category::Column::ProductId)
                        .from(ProductCategory)
                        .and_where(
                            product_category::Column::CategoryId.is_in(filter.category_ids.clone()),
                        )
                        .to_owned(),
                ),
            );
        }

        if let Some(is_active) = filter.is_active {
            query = query.filter(product::Column::IsActive.eq(is_active));
        }

        if let Some(is_featured) = filter.is_featured {
            query = query.filter(product::Column::IsFeatured.eq(is_featured));
        }

        if filter.min_price.is_some() || filter.max_price.is_some() {
            let mut price = Condition::all();
            if let Some(min) = filter.min_price {
                price = price.add(product_variant::Column::Price.gte(min));
            }
            if let Some(max) = filter.max_price {
                price = price.add(product_variant::Column::Price.lte(max));
            }
            query = query.filter(
                product::Column::Id.in_subquery(
                    Query::select()
                        .column(product_variant::Column::ProductId)
                        .from(ProductVariant)
                        .cond_where(price)
                        .to_owned(),
                ),
            );
        }

        if let Some(from) = filter.created_from {
            query = query.filter(product::Column::CreatedAt.gte(from));
        }

        if let Some(to) = filter.created_to {
            query = query.filter(product::Column::CreatedAt.lte(to));
        }

        query
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id)
    }
}
