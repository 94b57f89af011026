use std::sync::Arc;
use std::time::Instant;

use tracing::warn;
use uppe_service::database::EndpointStore;
use uppe_service::metrics::series::{Operation, observe_operation, register_fixed};
use uppe_service::metrics::{MetricRegistry, RegistryError};

/// Handles shared by every request handler and the updater
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EndpointStore>,
    pub registry: Arc<MetricRegistry>,
}

impl AppState {
    /// Build the state and expose the fixed series right away
    pub async fn new(store: Arc<dyn EndpointStore>) -> Result<Self, RegistryError> {
        let registry = Arc::new(MetricRegistry::new());
        register_fixed(&registry).await?;
        Ok(Self { store, registry })
    }

    /// Count a handled request and its duration since `start`
    pub async fn observe(&self, operation: Operation, start: Instant) {
        if let Err(e) = observe_operation(&self.registry, operation, start.elapsed()).await {
            warn!(operation = operation.as_str(), "Failed to record request metrics: {}", e);
        }
    }
}
