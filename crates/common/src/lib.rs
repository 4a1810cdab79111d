//! Common utilities and shared types for emporium.
//!
//! This crate provides foundational components used across all emporium crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Metrics**: Export pipeline counters via [`Metrics`]
//! - **Storage**: File storage backends for generated exports
//!
//! # Example
//!
//! ```no_run
//! use emporium_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{} mode, new id {id}", config.export.mode.as_str());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod metrics;
pub mod storage;

pub use config::{ColumnPolicy, Config, ExecutionMode, ExportConfig, RedisConfig};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use metrics::{Metrics, MetricsSnapshot, Timer, get_metrics};
pub use storage::{LocalStorage, StorageBackend, UploadedFile, export_storage_key, safe_file_name};
