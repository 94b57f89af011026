//! uppe-service: endpoint probing and metrics for the Uppe exporter.
//!
//! # Architecture
//!
//! ```text
//! MonitoringScheduler (every interval)
//!   └── Updater::run_cycle()
//!         ├── EndpointStore::list()
//!         ├── Prober: registration check, then echo probe
//!         ├── EndpointStore::update()
//!         └── MetricRegistry: per-endpoint gauges and latency histogram
//!
//! /metrics
//!   └── exposition::gather(MetricRegistry) → text/plain
//! ```

pub mod config;
pub mod database;
pub mod metrics;
pub mod monitoring;
pub mod pool;

pub use config::Config;
