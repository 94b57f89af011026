//! Names and shapes of every series the exporter publishes.

use std::time::Duration;

use super::registry::{MetricKind, MetricRegistry, RegistryError, SeriesOpts};

/// Prefix of every exposed metric name
pub const NAMESPACE: &str = "uppe";

/// Duration buckets (seconds) of the per-operation histograms
pub const DURATION_BUCKETS: &[f64] = &[1.0, 2.0, 5.0, 6.0, 10.0];

/// Latency buckets (milliseconds) of the per-endpoint histograms
pub const LATENCY_BUCKETS: &[f64] = &[0.0, 10.0, 20.0, 25.0, 30.0, 35.0, 50.0, 100.0];

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
///
/// Distinct names can collapse to the same key (`a.b` and `a-b`); such
/// endpoints share their series.
pub fn sanitize(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect()
}

/// Operations with a fixed request counter and duration histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Index,
    Add,
    Delete,
    Updater,
}

impl Operation {
    pub const ALL: [Operation; 4] =
        [Operation::Index, Operation::Add, Operation::Delete, Operation::Updater];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Index => "index",
            Operation::Add => "add",
            Operation::Delete => "delete",
            Operation::Updater => "updater",
        }
    }

    pub fn counter_key(&self) -> String {
        format!("c_{}", self.as_str())
    }

    pub fn histogram_key(&self) -> String {
        format!("h_{}", self.as_str())
    }

    fn counter_opts(&self) -> SeriesOpts {
        SeriesOpts::new(
            format!("{NAMESPACE}_request_{}_operations_total", self.as_str()),
            format!("The total number of processed {} requests", self.as_str()),
        )
    }

    fn histogram_opts(&self) -> SeriesOpts {
        SeriesOpts::new(
            format!("{NAMESPACE}_request_{}_duration_seconds", self.as_str()),
            format!("Histogram for the duration of the {} method in seconds.", self.as_str()),
        )
        .buckets(DURATION_BUCKETS)
    }
}

/// Create the fixed series so they are exposed before anything happens
pub async fn register_fixed(registry: &MetricRegistry) -> Result<(), RegistryError> {
    for operation in Operation::ALL {
        registry
            .get_or_create(&operation.counter_key(), MetricKind::Counter, &operation.counter_opts())
            .await?;
        registry
            .get_or_create(
                &operation.histogram_key(),
                MetricKind::Histogram,
                &operation.histogram_opts(),
            )
            .await?;
    }
    Ok(())
}

/// Count one run of `operation` and record how long it took
pub async fn observe_operation(
    registry: &MetricRegistry,
    operation: Operation,
    elapsed: Duration,
) -> Result<(), RegistryError> {
    registry.record_counter(&operation.counter_key(), &operation.counter_opts()).await?;
    registry
        .record_histogram(&operation.histogram_key(), &operation.histogram_opts(), elapsed.as_secs_f64())
        .await
}

/// The three dynamic series of one endpoint
pub struct EndpointSeries {
    name: String,
    key: String,
}

impl EndpointSeries {
    pub fn new(endpoint_name: &str) -> Self {
        Self { name: endpoint_name.to_string(), key: sanitize(endpoint_name) }
    }

    pub fn registered_key(&self) -> String {
        format!("g_{}_registered", self.key)
    }

    pub fn up_key(&self) -> String {
        format!("g_{}_up", self.key)
    }

    pub fn latency_key(&self) -> String {
        format!("h_{}_latency", self.key)
    }

    pub async fn record_registered(
        &self,
        registry: &MetricRegistry,
        registered: bool,
    ) -> Result<(), RegistryError> {
        let opts = SeriesOpts::new(
            format!("{NAMESPACE}_{}_registered", self.key),
            format!("Check if {} is registered", self.name),
        );
        registry.record_gauge(&self.registered_key(), &opts, flag(registered)).await
    }

    pub async fn record_up(&self, registry: &MetricRegistry, up: bool) -> Result<(), RegistryError> {
        let opts = SeriesOpts::new(
            format!("{NAMESPACE}_{}_up", self.key),
            format!("Check if {} is up", self.name),
        );
        registry.record_gauge(&self.up_key(), &opts, flag(up)).await
    }

    pub async fn record_latency(
        &self,
        registry: &MetricRegistry,
        latency_ms: f64,
    ) -> Result<(), RegistryError> {
        let opts = SeriesOpts::new(
            format!("{NAMESPACE}_{}_latency", self.key),
            format!("Histogram for the latency of {}", self.name),
        )
        .buckets(LATENCY_BUCKETS);
        registry.record_histogram(&self.latency_key(), &opts, latency_ms).await
    }
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
