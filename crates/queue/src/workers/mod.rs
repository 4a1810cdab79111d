//! Job workers.

mod export;

pub use export::{ExportWorkerContext, export_worker};
