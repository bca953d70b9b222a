//! Periodic health-check runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::health::registry::HealthRegistry;

/// Runs every registered check on a fixed period.
pub struct HealthScheduler {
    registry: Arc<HealthRegistry>,
    initial_delay: Duration,
    period: Duration,
}

impl HealthScheduler {
    pub fn new(registry: Arc<HealthRegistry>, initial_delay: Duration, period: Duration) -> Self {
        Self {
            registry,
            initial_delay,
            period,
        }
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            checks = self.registry.len(),
            initial_delay_secs = self.initial_delay.as_secs(),
            interval_secs = self.period.as_secs(),
            "Health scheduler starting"
        );

        let mut ticker = time::interval_at(
            time::Instant::now() + self.initial_delay,
            self.period.max(Duration::from_millis(1)),
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let results = self.registry.run_all();
                    tracing::debug!(checks = results.len(), "Health checks run");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
