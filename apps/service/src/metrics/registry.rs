//! Named, typed metric series created on demand.
//!
//! Series are `prometheus` primitives behind an `Arc`; a cloned handle sees
//! live values. A series is fully built before it is inserted under the write
//! lock, and [`MetricRegistry::snapshot`] copies the handles out under the
//! read lock.

use std::collections::HashMap;
use std::fmt;

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Opts};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Histogram => write!(f, "histogram"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("series {key} is a {existing}, not a {requested}")]
    KindMismatch { key: String, existing: MetricKind, requested: MetricKind },

    #[error("invalid series definition: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Construction arguments for a series, used only when it does not exist yet
#[derive(Debug, Clone)]
pub struct SeriesOpts {
    pub name: String,
    pub help: String,
    /// Histogram upper bounds; `+Inf` is always implied
    pub buckets: Vec<f64>,
}

impl SeriesOpts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self { name: name.into(), help: help.into(), buckets: Vec::new() }
    }

    pub fn buckets(mut self, buckets: &[f64]) -> Self {
        self.buckets = buckets.to_vec();
        self
    }
}

#[derive(Clone)]
pub enum Metric {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
}

impl Metric {
    fn build(kind: MetricKind, opts: &SeriesOpts) -> Result<Self, RegistryError> {
        let metric = match kind {
            MetricKind::Counter => {
                Metric::Counter(Counter::with_opts(Opts::new(&opts.name, &opts.help))?)
            }
            MetricKind::Gauge => Metric::Gauge(Gauge::with_opts(Opts::new(&opts.name, &opts.help))?),
            MetricKind::Histogram => Metric::Histogram(Histogram::with_opts(
                HistogramOpts::new(&opts.name, &opts.help).buckets(opts.buckets.clone()),
            )?),
        };
        Ok(metric)
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Histogram(_) => MetricKind::Histogram,
        }
    }

    /// Current state as exposition families
    pub fn collect(&self) -> Vec<MetricFamily> {
        match self {
            Metric::Counter(counter) => counter.collect(),
            Metric::Gauge(gauge) => gauge.collect(),
            Metric::Histogram(histogram) => histogram.collect(),
        }
    }
}

/// One registered series
#[derive(Clone)]
pub struct MetricSeries {
    key: String,
    metric: Metric,
}

impl MetricSeries {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> MetricKind {
        self.metric.kind()
    }

    pub fn metric(&self) -> &Metric {
        &self.metric
    }
}

impl fmt::Debug for MetricSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricSeries").field("key", &self.key).field("kind", &self.kind()).finish()
    }
}

#[derive(Default)]
struct Table {
    /// Insertion order, which is also exposition order
    ordered: Vec<MetricSeries>,
    index: HashMap<String, usize>,
}

impl Table {
    fn get(&self, key: &str) -> Option<&MetricSeries> {
        self.index.get(key).map(|&position| &self.ordered[position])
    }
}

fn check_kind(series: &MetricSeries, requested: MetricKind) -> Result<MetricSeries, RegistryError> {
    if series.kind() == requested {
        Ok(series.clone())
    } else {
        Err(RegistryError::KindMismatch {
            key: series.key.clone(),
            existing: series.kind(),
            requested,
        })
    }
}

/// Concurrency-safe mapping from key to series.
///
/// Keys are unique and a series keeps its kind for the lifetime of the
/// registry. Series are never removed.
#[derive(Default)]
pub struct MetricRegistry {
    table: RwLock<Table>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the series stored under `key`, creating it from `opts` if absent
    pub async fn get_or_create(
        &self,
        key: &str,
        kind: MetricKind,
        opts: &SeriesOpts,
    ) -> Result<MetricSeries, RegistryError> {
        if let Some(series) = self.table.read().await.get(key) {
            return check_kind(series, kind);
        }

        let mut table = self.table.write().await;
        // Another writer may have won the race between the two locks
        if let Some(series) = table.get(key) {
            return check_kind(series, kind);
        }

        let series = MetricSeries { key: key.to_string(), metric: Metric::build(kind, opts)? };
        let position = table.ordered.len();
        table.index.insert(series.key.clone(), position);
        table.ordered.push(series.clone());
        debug!(key, %kind, name = %opts.name, "created metric series");

        Ok(series)
    }

    /// Increment a counter
    pub async fn record_counter(&self, key: &str, opts: &SeriesOpts) -> Result<(), RegistryError> {
        if let Metric::Counter(counter) = self.get_or_create(key, MetricKind::Counter, opts).await?.metric {
            counter.inc();
        }
        Ok(())
    }

    /// Set a gauge
    pub async fn record_gauge(
        &self,
        key: &str,
        opts: &SeriesOpts,
        value: f64,
    ) -> Result<(), RegistryError> {
        if let Metric::Gauge(gauge) = self.get_or_create(key, MetricKind::Gauge, opts).await?.metric {
            gauge.set(value);
        }
        Ok(())
    }

    /// Add an observation to a histogram
    pub async fn record_histogram(
        &self,
        key: &str,
        opts: &SeriesOpts,
        value: f64,
    ) -> Result<(), RegistryError> {
        if let Metric::Histogram(histogram) =
            self.get_or_create(key, MetricKind::Histogram, opts).await?.metric
        {
            histogram.observe(value);
        }
        Ok(())
    }

    /// Every series in creation order
    pub async fn snapshot(&self) -> Vec<MetricSeries> {
        self.table.read().await.ordered.clone()
    }

    #[cfg(test)]
    pub(crate) async fn get(&self, key: &str) -> Option<MetricSeries> {
        self.table.read().await.get(key).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.table.read().await.ordered.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
