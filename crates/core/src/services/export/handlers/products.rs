//! Catalog product export handler.

use async_trait::async_trait;
use emporium_common::AppResult;
use emporium_db::entities::product::ProductStatus;
use emporium_db::repositories::{ProductExportFilter, ProductExportRecord, ProductRepository};
use serde::Serialize;
use serde_json::{Value, json};

use crate::services::export::columns::{ExportColumn, ExportRow};
use crate::services::export::handler::{ExportPage, PageRequest, ResourceExporter};
use crate::services::export::payload::ExportFilters;

pub const PRODUCTS_RESOURCE: &str = "products";

/// Exports products with their variants, brand and categories.
pub struct ProductsExportHandler {
    repo: ProductRepository,
    columns: Vec<ExportColumn>,
}

impl ProductsExportHandler {
    #[must_use]
    pub fn new(repo: ProductRepository) -> Self {
        Self {
            repo,
            columns: product_columns(),
        }
    }
}

fn product_columns() -> Vec<ExportColumn> {
    vec![
        ExportColumn::new("id", "ID"),
        ExportColumn::new("name", "Name"),
        ExportColumn::new("sku", "SKU"),
        ExportColumn::new("status", "Status"),
        ExportColumn::new("isActive", "Active"),
        ExportColumn::new("isFeatured", "Featured"),
        ExportColumn::new("priceRange", "Price Range"),
        ExportColumn::new("variantCount", "Variants"),
        ExportColumn::new("brand", "Brand"),
        ExportColumn::new("categories", "Categories"),
        ExportColumn::new("createdAt", "Created At").with_formatter("datetime"),
        ExportColumn::new("updatedAt", "Updated At").with_formatter("datetime"),
    ]
}

/// Record wrapper so the repository type stays free of serde concerns.
pub struct ProductRecord(pub ProductExportRecord);

impl Serialize for ProductRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::Object(product_row(&self.0)).serialize(serializer)
    }
}

#[async_trait]
impl ResourceExporter for ProductsExportHandler {
    type Record = ProductRecord;

    fn resource(&self) -> &str {
        PRODUCTS_RESOURCE
    }

    fn columns(&self) -> &[ExportColumn] {
        &self.columns
    }

    async fn fetch_page(
        &self,
        page: PageRequest,
        filters: &ExportFilters,
    ) -> AppResult<ExportPage<ProductRecord>> {
        let filter = normalize_filters(filters);
        let (records, total) = self
            .repo
            .find_export_page(&filter, page.page, page.limit)
            .await?;

        Ok(ExportPage {
            items: records.into_iter().map(ProductRecord).collect(),
            total,
        })
    }

    fn transform_record(&self, record: ProductRecord) -> AppResult<ExportRow> {
        Ok(product_row(&record.0))
    }
}

/// Turn the generic filter bag into a typed product filter.
#[must_use]
pub fn normalize_filters(filters: &ExportFilters) -> ProductExportFilter {
    let price_bounds = match (filters.number("minPrice"), filters.number("maxPrice")) {
        (Some(min), Some(max)) if min > max => (Some(max), Some(min)),
        bounds => bounds,
    };

    ProductExportFilter {
        search: filters.string("search"),
        statuses: filters
            .string_list("status")
            .iter()
            .filter_map(|s| ProductStatus::parse(s))
            .collect(),
        brand_ids: filters.string_list("brandIds"),
        category_ids: filters.string_list("categoryIds"),
        is_active: filters.bool("isActive"),
        is_featured: filters.bool("isFeatured"),
        min_price: price_bounds.0,
        max_price: price_bounds.1,
        created_from: filters.datetime("createdFrom"),
        created_to: filters.datetime("createdTo"),
    }
}

/// Flatten a product and its relations into an export row.
#[must_use]
pub fn product_row(record: &ProductExportRecord) -> ExportRow {
    let product = &record.product;

    let sku = product
        .sku
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            record
                .variants
                .iter()
                .find_map(|v| v.sku.clone().filter(|s| !s.is_empty()))
        });

    let categories = record
        .categories
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let row = json!({
        "id": product.id,
        "name": product.name,
        "sku": sku,
        "status": product.status.as_str(),
        "isActive": product.is_active,
        "isFeatured": product.is_featured,
        "priceRange": price_range(record.variants.iter().map(|v| v.price)),
        "variantCount": record.variants.len(),
        "brand": record.brand.as_ref().map(|b| b.name.clone()),
        "categories": categories,
        "createdAt": product.created_at.to_rfc3339(),
        "updatedAt": product.updated_at.map(|t| t.to_rfc3339()),
    });

    match row {
        Value::Object(map) => map,
        _ => ExportRow::new(),
    }
}

/// `min` when every price is equal, `"min - max"` otherwise, empty without prices.
#[must_use]
pub fn price_range(prices: impl Iterator<Item = f64>) -> String {
    let bounds = prices.fold(None, |acc: Option<(f64, f64)>, price| match acc {
        None => Some((price, price)),
        Some((min, max)) => Some((min.min(price), max.max(price))),
    });

    match bounds {
        None => String::new(),
        Some((min, max)) if (max - min).abs() < f64::EPSILON => format!("{min:.2}"),
        Some((min, max)) => format!("{min:.2} - {max:.2}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use emporium_db::entities::{brand, category, product, product_variant};
    use serde_json::json;

    fn filters(value: Value) -> ExportFilters {
        match value {
            Value::Object(map) => ExportFilters::new(map),
            _ => panic!("expected object"),
        }
    }

    fn variant(id: &str, sku: Option<&str>, price: f64) -> product_variant::Model {
        product_variant::Model {
            id: id.to_string(),
            product_id: "p1".to_string(),
            sku: sku.map(ToString::to_string),
            price,
            created_at: Utc::now().into(),
        }
    }

    fn record(variants: Vec<product_variant::Model>) -> ProductExportRecord {
        ProductExportRecord {
            product: product::Model {
                id: "p1".to_string(),
                name: "Trail Shoe".to_string(),
                sku: None,
                status: ProductStatus::Active,
                is_active: true,
                is_featured: false,
                brand_id: Some("b1".to_string()),
                created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap().into(),
                updated_at: None,
            },
            variants,
            brand: Some(brand::Model {
                id: "b1".to_string(),
                name: "Acme".to_string(),
            }),
            categories: vec![
                category::Model {
                    id: "c1".to_string(),
                    name: "Shoes".to_string(),
                },
                category::Model {
                    id: "c2".to_string(),
                    name: "Outdoor".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_normalize_filters() {
        let filter = normalize_filters(&filters(json!({
            "search": " trail ",
            "status": ["active", "bogus", "ARCHIVED"],
            "brandIds": ["b1", ""],
            "categoryIds": "c1",
            "isActive": true,
            "isFeatured": "true",
            "minPrice": 50,
            "maxPrice": 10,
        })));

        assert_eq!(filter.search.as_deref(), Some("trail"));
        assert_eq!(
            filter.statuses,
            vec![ProductStatus::Active, ProductStatus::Archived]
        );
        assert_eq!(filter.brand_ids, ["b1"]);
        assert_eq!(filter.category_ids, ["c1"]);
        assert_eq!(filter.is_active, Some(true));
        assert_eq!(filter.is_featured, None);
        assert_eq!(filter.min_price, Some(10.0));
        assert_eq!(filter.max_price, Some(50.0));
    }

    #[test]
    fn test_price_bounds_kept_when_ordered_or_partial() {
        let ordered = normalize_filters(&filters(json!({ "minPrice": 5, "maxPrice": 20 })));
        assert_eq!((ordered.min_price, ordered.max_price), (Some(5.0), Some(20.0)));

        let min_only = normalize_filters(&filters(json!({ "minPrice": 30 })));
        assert_eq!((min_only.min_price, min_only.max_price), (Some(30.0), None));
    }

    #[test]
    fn test_product_row_derived_fields() {
        let row = product_row(&record(vec![
            variant("v1", Some("TS-42"), 89.9),
            variant("v2", None, 99.0),
        ]));

        assert_eq!(row["sku"], json!("TS-42"));
        assert_eq!(row["priceRange"], json!("89.90 - 99.00"));
        assert_eq!(row["variantCount"], json!(2));
        assert_eq!(row["brand"], json!("Acme"));
        assert_eq!(row["categories"], json!("Shoes, Outdoor"));
        assert_eq!(row["status"], json!("active"));
        assert_eq!(row["updatedAt"], Value::Null);
    }

    #[test]
    fn test_price_range() {
        assert_eq!(price_range(std::iter::empty()), "");
        assert_eq!(price_range([12.5, 12.5].into_iter()), "12.50");
        assert_eq!(price_range([30.0, 5.0, 12.0].into_iter()), "5.00 - 30.00");
    }

    #[test]
    fn test_product_row_without_variants() {
        let row = product_row(&record(Vec::new()));
        assert_eq!(row["sku"], Value::Null);
        assert_eq!(row["priceRange"], json!(""));
        assert_eq!(row["variantCount"], json!(0));
    }
}
