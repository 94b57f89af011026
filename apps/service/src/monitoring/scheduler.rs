use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use super::updater::Updater;

/// Triggers the updater at a fixed period on its own task
pub struct MonitoringScheduler {
    updater: Arc<Updater>,
    period: Duration,
}

impl MonitoringScheduler {
    pub fn new(updater: Arc<Updater>, period: Duration) -> Self {
        Self { updater, period }
    }

    /// Start ticking; the first cycle runs one period from now.
    ///
    /// Each tick spawns its cycle and goes back to waiting, so a cycle that
    /// outlives the period overlaps with the next one.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + self.period, self.period);

            loop {
                timer.tick().await;

                let updater = self.updater.clone();
                tokio::spawn(async move {
                    match updater.run_cycle().await {
                        Ok(report) => tracing::info!(
                            endpoints = report.endpoints,
                            updated = report.updated,
                            store_failures = report.store_failures,
                            "Monitoring cycle finished"
                        ),
                        Err(e) => tracing::error!("Monitoring cycle failed: {:#}", e),
                    }
                });
            }
        })
    }
}
