//! Periodic capacity replenishment, racing allocation by design.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;

use super::fleet::FleetRegistry;
use super::metrics::MetricsSink;
use super::scheduler::Shutdown;

/// Background cycle restoring capacity to the fleet on a fixed period.
///
/// Runs independently of queue activity. Each tick credits the configured
/// amount to every non-offline unit, clamped to total capacity; a unit whose
/// available capacity rises above zero becomes `Available` again. All credits
/// go through the registry lock, so ticks are mutually exclusive with
/// allocation walks and releases on the same units.
pub struct Replenisher {
    fleet: Arc<FleetRegistry>,
    period: Duration,
    amount: f64,
    shutdown: Arc<Shutdown>,
    metrics: Option<Arc<Mutex<Box<dyn MetricsSink>>>>,
}

impl Replenisher {
    /// Create a cycle over the given fleet.
    pub fn new(
        fleet: Arc<FleetRegistry>,
        period: Duration,
        amount: f64,
        shutdown: Arc<Shutdown>,
        metrics: Option<Arc<Mutex<Box<dyn MetricsSink>>>>,
    ) -> Self {
        Self {
            fleet,
            period,
            amount,
            shutdown,
            metrics,
        }
    }

    /// Tick until shutdown.
    pub async fn run(self) {
        tracing::debug!(period_ms = self.period.as_millis() as u64, amount = self.amount, "replenishment cycle started");
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick fires immediately; consume it so the first
        // replenishment lands one full period in.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = self.fleet.replenish_all(self.amount);
                    tracing::debug!(
                        total_available = snapshot.total_available,
                        total_capacity = snapshot.total_capacity,
                        "replenishment tick"
                    );
                    if let Some(sink) = &self.metrics {
                        sink.lock().record_fleet(snapshot);
                    }
                }
                () = self.shutdown.wait() => break,
            }
        }
        tracing::debug!("replenishment cycle stopped");
    }
}
