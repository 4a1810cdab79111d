//! Built-in resource export handlers.

mod products;
mod users;

use std::sync::Arc;

use emporium_db::repositories::{ProductRepository, UserRepository};
use sea_orm::DatabaseConnection;

pub use products::{
    PRODUCTS_RESOURCE, ProductRecord, ProductsExportHandler, normalize_filters, price_range,
    product_row,
};
pub use users::{USERS_RESOURCE, UserRecord, UsersExportHandler, user_row};

use super::registry::ExportHandlerRegistry;

/// Register every built-in handler.
pub fn register_default_handlers(registry: &mut ExportHandlerRegistry, db: Arc<DatabaseConnection>) {
    registry.register(ProductsExportHandler::new(ProductRepository::new(db.clone())));
    registry.register(UsersExportHandler::new(UserRepository::new(db)));
}
