/// Monitoring engine module - keeps endpoint state fresh
///
/// This module is responsible for:
/// - Classifying user input into endpoints
/// - Running registration and echo checks
/// - Scheduling the periodic update cycle
/// - Feeding results to the store and the metric registry
pub mod checker;
pub mod classifier;
pub mod prober;
pub mod scheduler;
pub mod types;
pub mod updater;

pub use classifier::{Classification, classify};
pub use prober::{NetworkProber, Prober};
pub use scheduler::MonitoringScheduler;
pub use types::{EndpointKind, ProbeOutcome, Reachability};
pub use updater::{CycleReport, Updater};
