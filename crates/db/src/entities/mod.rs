//! Database entities.

#![allow(missing_docs)]

pub mod brand;
pub mod category;
pub mod export_job;
pub mod product;
pub mod product_category;
pub mod product_variant;
pub mod user;
pub mod user_profile;

pub use brand::Entity as Brand;
pub use category::Entity as Category;
pub use export_job::Entity as ExportJob;
pub use product::Entity as Product;
pub use product_category::Entity as ProductCategory;
pub use product_variant::Entity as ProductVariant;
pub use user::Entity as User;
pub use user_profile::Entity as UserProfile;
