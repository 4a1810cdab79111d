//! Background export queue for emporium.
//!
//! This crate provides asynchronous export processing using Redis:
//!
//! - **Jobs**: the `export:generate` message
//! - **Publisher**: [`RedisExportQueue`], the Redis-backed [`ExportQueue`](emporium_core::ExportQueue)
//! - **Workers**: the apalis consumer that runs the export processor

pub mod jobs;
pub mod publisher;
pub mod workers;

pub use jobs::*;
pub use publisher::RedisExportQueue;
pub use workers::*;
