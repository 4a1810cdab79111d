//! Data export pipeline.
//!
//! A request is persisted as a pending [`export_job`](emporium_db::entities::export_job)
//! by [`DataExportService`]. [`ExportJobRunner`] then either processes it in-process
//! through [`ExportProcessor`] or publishes it on an [`ExportQueue`] for a worker.
//! The processor pages through the [`ExportHandler`] registered for the resource,
//! writes CSV or JSON, stores the file and moves the job to a terminal status.

pub mod columns;
pub mod handler;
pub mod handlers;
pub mod payload;
pub mod processor;
pub mod queue;
pub mod registry;
pub mod runner;
pub mod service;
pub mod store;
pub mod writer;

pub use columns::{ExportColumn, ExportRow};
pub use handler::{DEFAULT_PAGE_SIZE, ExportHandler, ExportPage, PageRequest, ResourceExporter};
pub use handlers::register_default_handlers;
pub use payload::{ExportFilters, ExportJobPayload, ExportOptions};
pub use processor::{ExportProcessor, ExportSummary};
pub use queue::{EXPORT_MESSAGE_TYPE, EXPORT_QUEUE, ExportQueue};
pub use registry::ExportHandlerRegistry;
pub use runner::{ExportJobRunner, RunOutcome};
pub use service::{
    CompletedExport, DataExportService, ExportJobList, ListJobsQuery, RequestExportInput,
};
pub use store::{ExportJobStore, InMemoryExportJobStore};
pub use writer::{FormatWriter, writer_for};
