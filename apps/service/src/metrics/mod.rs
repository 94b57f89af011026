//! Metrics published on `/metrics`.
//!
//! ```text
//! MetricRegistry
//!   ├── get_or_create() ← updater and request handlers
//!   └── snapshot() → exposition::render() → text/plain body
//! ```

pub mod exposition;
pub mod registry;
pub mod series;

pub use registry::{MetricKind, MetricRegistry, MetricSeries, RegistryError, SeriesOpts};
pub use series::{EndpointSeries, Operation, sanitize};
