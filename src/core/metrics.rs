//! Metrics handoff to the external collector.
//!
//! The core reports per-event outcomes and per-tick fleet snapshots through
//! [`MetricsSink`]; aggregation, statistics, and export are the collector's
//! concern. Recording is a brief synchronous critical section so the core
//! never blocks on collector processing.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::event::{EventId, EventPriority};

/// Outcome report for one resolved event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventReport {
    /// The resolved event.
    pub event_id: EventId,
    /// Priority class of the event.
    pub priority: EventPriority,
    /// Whether the event completed (allocation and execution both succeeded).
    pub success: bool,
    /// Seconds from the start of processing to resolution.
    pub response_time_secs: f64,
    /// Fleet utilization fraction observed at resolution.
    pub utilization_at_completion: f64,
    /// Classification tag carried from the event.
    pub event_type: String,
}

/// Fleet totals observed after a replenishment tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FleetSnapshot {
    /// Sum of total capacity over non-offline units.
    pub total_capacity: f64,
    /// Sum of available capacity over non-offline units.
    pub total_available: f64,
}

impl FleetSnapshot {
    /// Fraction of capacity currently allocated, in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        if self.total_capacity > 0.0 {
            (self.total_capacity - self.total_available) / self.total_capacity
        } else {
            0.0
        }
    }
}

/// Sink abstraction for the external metrics collector.
pub trait MetricsSink: Send {
    /// Record the outcome of one resolved event.
    fn record_event(&mut self, report: EventReport);
    /// Record fleet totals after a replenishment tick.
    fn record_fleet(&mut self, snapshot: FleetSnapshot);
}

struct SinkBuffers {
    events: VecDeque<EventReport>,
    fleet: VecDeque<FleetSnapshot>,
}

/// In-memory sink for tests and development, with a bounded buffer.
///
/// Cloning shares the underlying buffers, so a test can keep one handle and
/// hand another to the dispatch system.
#[derive(Clone)]
pub struct InMemoryMetricsSink {
    buffers: Arc<Mutex<SinkBuffers>>,
    max_entries: usize,
}

impl InMemoryMetricsSink {
    /// Create a sink retaining at most `max_entries` reports per kind.
    pub fn new(max_entries: usize) -> Self {
        Self {
            buffers: Arc::new(Mutex::new(SinkBuffers {
                events: VecDeque::with_capacity(max_entries.min(1024)),
                fleet: VecDeque::with_capacity(max_entries.min(1024)),
            })),
            max_entries,
        }
    }

    /// Snapshot of recorded event reports, oldest first.
    pub fn event_reports(&self) -> Vec<EventReport> {
        self.buffers.lock().events.iter().cloned().collect()
    }

    /// Snapshot of recorded fleet snapshots, oldest first.
    pub fn fleet_snapshots(&self) -> Vec<FleetSnapshot> {
        self.buffers.lock().fleet.iter().cloned().collect()
    }
}

impl MetricsSink for InMemoryMetricsSink {
    fn record_event(&mut self, report: EventReport) {
        let mut buffers = self.buffers.lock();
        if buffers.events.len() >= self.max_entries {
            buffers.events.pop_front();
        }
        buffers.events.push_back(report);
    }

    fn record_fleet(&mut self, snapshot: FleetSnapshot) {
        let mut buffers = self.buffers.lock();
        if buffers.fleet.len() >= self.max_entries {
            buffers.fleet.pop_front();
        }
        buffers.fleet.push_back(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn report(success: bool) -> EventReport {
        EventReport {
            event_id: EventId(Uuid::new_v4()),
            priority: EventPriority::Medium,
            success,
            response_time_secs: 0.1,
            utilization_at_completion: 0.5,
            event_type: "grid_stability".into(),
        }
    }

    #[test]
    fn bounded_buffer_drops_oldest() {
        let mut sink = InMemoryMetricsSink::new(2);
        sink.record_event(report(true));
        sink.record_event(report(true));
        sink.record_event(report(false));
        let reports = sink.event_reports();
        assert_eq!(reports.len(), 2);
        assert!(!reports[1].success);
    }

    #[test]
    fn snapshot_utilization() {
        let snapshot = FleetSnapshot {
            total_capacity: 200.0,
            total_available: 150.0,
        };
        assert!((snapshot.utilization() - 0.25).abs() < 1e-12);
    }
}
