//! Export handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::handler::ExportHandler;

/// Map from resource key to handler.
///
/// Built by the composition root during start-up and shared behind an `Arc`
/// afterwards. Registrations are never removed.
#[derive(Default)]
pub struct ExportHandlerRegistry {
    handlers: HashMap<String, Arc<dyn ExportHandler>>,
}

impl ExportHandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A second handler for the same resource replaces the first.
    pub fn register<H: ExportHandler + 'static>(&mut self, handler: H) {
        self.register_arc(Arc::new(handler));
    }

    pub fn register_arc(&mut self, handler: Arc<dyn ExportHandler>) {
        let resource = handler.resource().to_string();

        if self.handlers.insert(resource.clone(), handler).is_some() {
            warn!(resource = %resource, "Export handler overwritten");
        } else {
            debug!(resource = %resource, "Export handler registered");
        }
    }

    #[must_use]
    pub fn get(&self, resource: &str) -> Option<Arc<dyn ExportHandler>> {
        self.handlers.get(resource).cloned()
    }

    /// Registered resource keys, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut resources: Vec<String> = self.handlers.keys().cloned().collect();
        resources.sort();
        resources
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
