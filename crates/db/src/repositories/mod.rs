//! Repository layer for database operations.

mod export_job;
mod product;
mod user;

pub use export_job::ExportJobRepository;
pub use product::{ProductExportFilter, ProductExportRecord, ProductRepository};
pub use user::{UserExportFilter, UserExportRecord, UserRepository};
