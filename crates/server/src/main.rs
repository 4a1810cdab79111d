//! Emporium export worker host.
//!
//! Consumes `export:generate` messages from the export queue and runs each job
//! through the export processor. Requests themselves are accepted by whichever
//! process embeds `ExportJobRunner`; this binary only hosts the worker.

use std::sync::Arc;

use apalis::layers::retry::RetryPolicy;
use apalis::prelude::*;
use emporium_common::{Config, LocalStorage};
use emporium_core::{
    DataExportService, ExportHandlerRegistry, ExportProcessor, register_default_handlers,
};
use emporium_db::repositories::ExportJobRepository;
use emporium_queue::{ExportWorkerContext, RedisExportQueue, export_worker};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Attempts after the first for an export that failed before it started.
const EXPORT_RETRIES: usize = 3;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emporium=debug".into()),
        )
        .init();

    info!("Starting emporium export worker...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = Arc::new(emporium_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    emporium_db::migrate(&db).await?;
    info!("Migrations completed");

    // Export handlers
    let mut registry = ExportHandlerRegistry::new();
    register_default_handlers(&mut registry, db.clone());
    let registry = Arc::new(registry);
    info!(resources = ?registry.list(), "Registered export handlers");

    // Services
    let storage = Arc::new(LocalStorage::from_settings(&config.storage));
    let export_service = DataExportService::new(Arc::new(ExportJobRepository::new(db.clone())));
    let processor = Arc::new(ExportProcessor::new(
        export_service,
        registry,
        storage,
        config.export.column_policy,
    ));

    let queue = Arc::new(RedisExportQueue::new(config.redis.clone()));

    // Start the export worker
    info!(queue = %queue.namespace(), "Starting export worker...");
    let redis_storage = queue.storage().await?;
    let export_ctx = ExportWorkerContext::new(processor);
    let concurrency = config.export.worker_concurrency.max(1);

    // Spawn the worker in the background
    tokio::spawn(async move {
        let monitor = Monitor::new().register({
            WorkerBuilder::new("export")
                .retry(RetryPolicy::retries(EXPORT_RETRIES))
                .concurrency(concurrency)
                .data(export_ctx)
                .backend(redis_storage)
                .build_fn(export_worker)
        });

        if let Err(e) = monitor.run().await {
            tracing::error!(error = %e, "Export worker failed");
        }
    });
    info!(concurrency, retries = EXPORT_RETRIES, "Export worker started");

    shutdown_signal().await;

    queue.close().await;
    info!("Shutdown complete");
    Ok(())
}
