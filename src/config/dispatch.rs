//! Dispatch system configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::der::ResourceUnit;
use crate::core::error::DispatchError;
use crate::core::fleet::FleetRegistry;

/// Configuration read once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of units in a uniformly built fleet.
    pub fleet_size: usize,
    /// Total capacity of each uniformly built unit.
    pub unit_capacity: f64,
    /// Replenishment cycle period in milliseconds.
    pub replenish_period_ms: u64,
    /// Capacity credited to each non-offline unit per tick.
    pub replenish_amount: f64,
    /// Number of concurrent scheduler loops.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Bounded delay a scheduler loop waits on an empty queue before
    /// re-checking, in milliseconds. Never zero (no busy-spinning).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fleet_size: 10,
            unit_capacity: 1000.0,
            replenish_period_ms: 1000,
            replenish_amount: 50.0,
            worker_count: default_worker_count(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DispatchConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.fleet_size == 0 {
            return Err("fleet_size must be greater than 0".into());
        }
        if !(self.unit_capacity > 0.0) {
            return Err("unit_capacity must be greater than 0".into());
        }
        if self.replenish_period_ms == 0 {
            return Err("replenish_period_ms must be greater than 0".into());
        }
        if !(self.replenish_amount > 0.0) {
            return Err("replenish_amount must be greater than 0".into());
        }
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Scheduler empty-queue wait as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Replenishment period as a `Duration`.
    pub fn replenish_period(&self) -> Duration {
        Duration::from_millis(self.replenish_period_ms)
    }

    /// Build a uniform fleet of `fleet_size` units (`der_0`, `der_1`, ...) at
    /// `unit_capacity` each.
    pub fn build_fleet(&self) -> Result<Arc<FleetRegistry>, DispatchError> {
        self.validate().map_err(DispatchError::InvalidConfig)?;
        let fleet = FleetRegistry::new();
        for i in 0..self.fleet_size {
            fleet.register(ResourceUnit::new(
                format!("der_{i}"),
                self.unit_capacity,
                format!("location_{i}"),
            )?)?;
        }
        Ok(Arc::new(fleet))
    }
}
