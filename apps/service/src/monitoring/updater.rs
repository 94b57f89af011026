use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::prober::Prober;
use super::types::{EndpointKind, ProbeOutcome};
use crate::database::{Endpoint, EndpointStore};
use crate::metrics::series::{EndpointSeries, Operation, observe_operation};
use crate::metrics::{MetricRegistry, RegistryError};

/// Summary of one monitoring cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Endpoints read from the store
    pub endpoints: usize,
    /// Endpoints whose new values were written back
    pub updated: usize,
    /// Endpoints whose write-back failed
    pub store_failures: usize,
}

/// Probe one endpoint: registration first, echo only if not known unregistered
pub async fn probe_endpoint(prober: &dyn Prober, endpoint: &Endpoint) -> ProbeOutcome {
    let registered = match (endpoint.kind, prober.check_registration(endpoint).await) {
        (EndpointKind::Hostname, _) => None,
        (EndpointKind::Domain, registered) => Some(registered.unwrap_or(false)),
    };

    if registered == Some(false) {
        return ProbeOutcome::unregistered();
    }

    ProbeOutcome::checked(registered, prober.check_reachability(endpoint).await)
}

/// Runs monitoring cycles: store → prober → store + registry
pub struct Updater {
    store: Arc<dyn EndpointStore>,
    prober: Arc<dyn Prober>,
    registry: Arc<MetricRegistry>,
}

impl Updater {
    pub fn new(
        store: Arc<dyn EndpointStore>,
        prober: Arc<dyn Prober>,
        registry: Arc<MetricRegistry>,
    ) -> Self {
        Self { store, prober, registry }
    }

    /// Run one full cycle.
    ///
    /// Only a failure to read the endpoint list ends the cycle early; the
    /// updater counter and duration are recorded either way.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let start = Instant::now();
        let result = self.refresh().await;

        if let Err(e) = observe_operation(&self.registry, Operation::Updater, start.elapsed()).await {
            warn!("Failed to record updater metrics: {}", e);
        }

        result
    }

    async fn refresh(&self) -> Result<CycleReport> {
        let mut endpoints = self.store.list().await?;
        let mut report = CycleReport { endpoints: endpoints.len(), ..CycleReport::default() };

        for endpoint in endpoints.iter_mut() {
            let outcome = probe_endpoint(self.prober.as_ref(), endpoint).await;
            info!(
                endpoint = %endpoint.name,
                registered = ?outcome.registered(),
                up = outcome.up(),
                latency_ms = ?outcome.latency_ms(),
                "probed endpoint"
            );
            endpoint.apply(outcome);

            match self.store.update(endpoint.id, outcome).await {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    warn!(endpoint = %endpoint.name, "Failed to store probe results: {}", e);
                    report.store_failures += 1;
                }
            }
        }

        for endpoint in &endpoints {
            if let Err(e) = self.publish(endpoint).await {
                warn!(endpoint = %endpoint.name, "Failed to update endpoint metrics: {}", e);
            }
        }

        Ok(report)
    }

    async fn publish(&self, endpoint: &Endpoint) -> Result<(), RegistryError> {
        let series = EndpointSeries::new(&endpoint.name);

        if let Some(registered) = endpoint.registered {
            series.record_registered(&self.registry, registered).await?;
        }
        if let Some(up) = endpoint.up {
            series.record_up(&self.registry, up).await?;
        }
        if let Some(latency_ms) = endpoint.latency_ms {
            series.record_latency(&self.registry, latency_ms).await?;
        }
        Ok(())
    }
}
