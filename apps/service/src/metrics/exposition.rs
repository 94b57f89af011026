//! Prometheus text exposition of the registry.

use prometheus::{Encoder, TextEncoder};

use super::registry::{MetricRegistry, MetricSeries, RegistryError};

/// Content type of the rendered body
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render `series` in order into the text format
pub fn render(series: &[MetricSeries]) -> Result<String, RegistryError> {
    let families: Vec<_> = series.iter().flat_map(|s| s.metric().collect()).collect();

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;

    // The text encoder only ever writes UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Snapshot the registry and render it
pub async fn gather(registry: &MetricRegistry) -> Result<String, RegistryError> {
    render(&registry.snapshot().await)
}
