//! Greedy capacity allocation with rollback.

use std::cmp::Ordering;
use std::sync::Arc;

use super::der::DerId;
use super::error::DispatchError;
use super::event::{DemandEvent, EventId};
use super::fleet::FleetRegistry;

/// A committed assignment of capacity from one or more units to one event.
///
/// Transient: it exists only for the duration of the event's processing, to
/// support rollback and release. [`AllocationEngine::release`] consumes the
/// record, so capacity can be credited back at most once per allocation.
#[derive(Debug)]
pub struct AllocationRecord {
    /// The event the capacity was committed to.
    pub event_id: EventId,
    entries: Vec<(DerId, f64)>,
}

impl AllocationRecord {
    /// The (unit, amount) pairs making up this allocation.
    pub fn entries(&self) -> &[(DerId, f64)] {
        &self.entries
    }

    /// Total capacity committed across all units.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, amount)| amount).sum()
    }
}

/// The greedy allocate/rollback/release algorithm over the fleet registry.
pub struct AllocationEngine {
    fleet: Arc<FleetRegistry>,
}

impl AllocationEngine {
    /// Create an engine operating on the given registry.
    pub fn new(fleet: Arc<FleetRegistry>) -> Self {
        Self { fleet }
    }

    /// Allocate capacity for an event.
    ///
    /// Snapshots the candidates, fast-fails when the aggregate cannot cover
    /// the requirement, then walks the candidates largest-available-first,
    /// deducting `min(available, remaining)` at each unit. The walk and its
    /// rollback are atomic with respect to all other registry mutations, but
    /// a concurrent allocation may drain capacity between snapshot and walk;
    /// that check-then-act race surfaces as
    /// [`DispatchError::PartialAllocationRace`] and is never retried here.
    pub fn allocate(&self, event: &DemandEvent) -> Result<AllocationRecord, DispatchError> {
        if !(event.requirement > 0.0) {
            return Err(DispatchError::AllocationEngine(format!(
                "non-positive requirement {} for event {}",
                event.requirement, event.id
            )));
        }

        let (mut candidates, aggregate) = self.fleet.candidate_snapshot();
        if aggregate < event.requirement {
            tracing::debug!(
                event_id = %event.id,
                required = event.requirement,
                available = aggregate,
                "allocation fast-fail"
            );
            return Err(DispatchError::InsufficientAggregateCapacity {
                required: event.requirement,
                available: aggregate,
            });
        }

        // Largest-available first, to touch as few units as possible.
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        let order: Vec<DerId> = candidates.into_iter().map(|(id, _)| id).collect();

        match self.fleet.try_allocate(&order, event.requirement) {
            Ok(entries) => {
                tracing::debug!(
                    event_id = %event.id,
                    units = entries.len(),
                    total = event.requirement,
                    "allocation committed"
                );
                Ok(AllocationRecord {
                    event_id: event.id,
                    entries,
                })
            }
            Err(remaining) => {
                tracing::warn!(
                    event_id = %event.id,
                    remaining,
                    "allocation raced concurrent deduction, rolled back"
                );
                Err(DispatchError::PartialAllocationRace { remaining })
            }
        }
    }

    /// Release a committed allocation, crediting every amount back to its
    /// unit, clamped to total capacity. Consumes the record: release happens
    /// exactly once per successful allocation by construction.
    pub fn release(&self, record: AllocationRecord) {
        tracing::debug!(
            event_id = %record.event_id,
            units = record.entries.len(),
            total = record.total(),
            "allocation released"
        );
        self.fleet.release_entries(&record.entries);
    }
}
