//! Fleet registry: sole owner of all resource units.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::der::{DerId, ResourceUnit, CAPACITY_EPSILON};
use super::error::DispatchError;
use super::metrics::FleetSnapshot;

/// Registry mapping unit identifiers to resource units.
///
/// All unit state lives behind a single `parking_lot::Mutex`, so every
/// read-then-mutate sequence (allocation walk, release credit, replenishment
/// credit) is one critical section. No other component holds a mutable view
/// of a unit; accessors hand out clones.
pub struct FleetRegistry {
    units: Mutex<HashMap<DerId, ResourceUnit>>,
}

impl FleetRegistry {
    /// Create an empty registry.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            units: Mutex::new(HashMap::new()),
        }
    }

    /// Register a unit under its identifier. Identifiers are unique.
    pub fn register(&self, unit: ResourceUnit) -> Result<(), DispatchError> {
        let mut units = self.units.lock();
        if units.contains_key(&unit.id) {
            return Err(DispatchError::DuplicateUnit(unit.id.to_string()));
        }
        tracing::debug!(unit_id = %unit.id, capacity = unit.capacity(), "unit registered");
        units.insert(unit.id.clone(), unit);
        Ok(())
    }

    /// Snapshot of a single unit, if registered.
    pub fn get(&self, id: &DerId) -> Option<ResourceUnit> {
        self.units.lock().get(id).cloned()
    }

    /// Consistent snapshot of every registered unit.
    pub fn snapshot(&self) -> Vec<ResourceUnit> {
        self.units.lock().values().cloned().collect()
    }

    /// Number of registered units.
    pub fn unit_count(&self) -> usize {
        self.units.lock().len()
    }

    /// Sum of available capacity over non-offline units, under one lock hold.
    pub fn total_available_capacity(&self) -> f64 {
        self.units
            .lock()
            .values()
            .filter(|u| !u.is_offline())
            .map(ResourceUnit::available)
            .sum()
    }

    /// Sum of total capacity over non-offline units.
    pub fn total_capacity(&self) -> f64 {
        self.units
            .lock()
            .values()
            .filter(|u| !u.is_offline())
            .map(ResourceUnit::capacity)
            .sum()
    }

    /// Fraction of non-offline capacity currently allocated, in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        let units = self.units.lock();
        let mut capacity = 0.0;
        let mut available = 0.0;
        for unit in units.values().filter(|u| !u.is_offline()) {
            capacity += unit.capacity();
            available += unit.available();
        }
        if capacity > 0.0 {
            (capacity - available) / capacity
        } else {
            0.0
        }
    }

    /// Administratively take a unit offline, excluding it from allocation and
    /// replenishment.
    pub fn set_offline(&self, id: &DerId) -> Result<(), DispatchError> {
        let mut units = self.units.lock();
        let unit = units
            .get_mut(id)
            .ok_or_else(|| DispatchError::UnknownUnit(id.to_string()))?;
        unit.set_offline();
        tracing::info!(unit_id = %id, "unit taken offline");
        Ok(())
    }

    /// Bring a unit back online.
    pub fn set_online(&self, id: &DerId) -> Result<(), DispatchError> {
        let mut units = self.units.lock();
        let unit = units
            .get_mut(id)
            .ok_or_else(|| DispatchError::UnknownUnit(id.to_string()))?;
        unit.set_online();
        tracing::info!(unit_id = %id, "unit brought online");
        Ok(())
    }

    /// Snapshot the allocation candidates: non-offline units with available
    /// capacity > 0, paired with their available capacity, plus the aggregate.
    pub(crate) fn candidate_snapshot(&self) -> (Vec<(DerId, f64)>, f64) {
        let units = self.units.lock();
        let mut candidates = Vec::new();
        let mut aggregate = 0.0;
        for unit in units.values() {
            if unit.is_offline() || unit.available() <= CAPACITY_EPSILON {
                continue;
            }
            aggregate += unit.available();
            candidates.push((unit.id.clone(), unit.available()));
        }
        (candidates, aggregate)
    }

    /// Walk candidates in the given order, deducting
    /// `min(current_available, remaining)` from each, atomically with respect
    /// to every other mutation. Returns the (unit, amount) pairs on success.
    ///
    /// If the walk cannot satisfy the full requirement (a concurrent
    /// allocation drained capacity between snapshot and walk), every deduction
    /// is restored inside the same critical section and the unmet remainder is
    /// returned as the error value.
    pub(crate) fn try_allocate(
        &self,
        order: &[DerId],
        requirement: f64,
    ) -> Result<Vec<(DerId, f64)>, f64> {
        let mut units = self.units.lock();
        let mut remaining = requirement;
        let mut entries: Vec<(DerId, f64)> = Vec::new();
        for id in order {
            if remaining <= CAPACITY_EPSILON {
                break;
            }
            let Some(unit) = units.get_mut(id) else {
                continue;
            };
            if unit.is_offline() || unit.available() <= CAPACITY_EPSILON {
                continue;
            }
            let amount = unit.available().min(remaining);
            unit.deduct(amount);
            entries.push((id.clone(), amount));
            remaining -= amount;
        }
        if remaining > CAPACITY_EPSILON {
            for (id, amount) in &entries {
                if let Some(unit) = units.get_mut(id) {
                    unit.credit(*amount);
                }
            }
            return Err(remaining);
        }
        Ok(entries)
    }

    /// Credit released amounts back to their units, clamped to capacity,
    /// under one lock hold.
    pub(crate) fn release_entries(&self, entries: &[(DerId, f64)]) {
        let mut units = self.units.lock();
        for (id, amount) in entries {
            if let Some(unit) = units.get_mut(id) {
                unit.credit(*amount);
            } else {
                tracing::warn!(unit_id = %id, "release for unregistered unit dropped");
            }
        }
    }

    /// Credit `amount` to every non-offline unit, clamped to capacity, and
    /// return the fleet totals after the tick. Called by the replenishment
    /// cycle; exposed for collaborators that drive ticks manually.
    pub fn replenish_all(&self, amount: f64) -> FleetSnapshot {
        let mut units = self.units.lock();
        let mut total_capacity = 0.0;
        let mut total_available = 0.0;
        for unit in units.values_mut() {
            if unit.is_offline() {
                continue;
            }
            unit.credit(amount);
            total_capacity += unit.capacity();
            total_available += unit.available();
        }
        FleetSnapshot {
            total_capacity,
            total_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::der::DerState;

    fn fleet_with(capacities: &[f64]) -> FleetRegistry {
        let fleet = FleetRegistry::new();
        for (i, cap) in capacities.iter().enumerate() {
            fleet
                .register(
                    ResourceUnit::new(format!("der_{i}"), *cap, format!("location_{i}")).unwrap(),
                )
                .unwrap();
        }
        fleet
    }

    #[test]
    fn duplicate_registration_rejected() {
        let fleet = fleet_with(&[100.0]);
        let dup = ResourceUnit::new("der_0", 50.0, "elsewhere").unwrap();
        assert!(matches!(
            fleet.register(dup),
            Err(DispatchError::DuplicateUnit(_))
        ));
    }

    #[test]
    fn offline_units_excluded_from_aggregates() {
        let fleet = fleet_with(&[100.0, 50.0]);
        assert_eq!(fleet.total_available_capacity(), 150.0);
        fleet.set_offline(&DerId::from("der_1")).unwrap();
        assert_eq!(fleet.total_available_capacity(), 100.0);
        assert_eq!(fleet.total_capacity(), 100.0);
        let (candidates, aggregate) = fleet.candidate_snapshot();
        assert_eq!(candidates.len(), 1);
        assert_eq!(aggregate, 100.0);
    }

    #[test]
    fn stale_snapshot_walk_rolls_back_completely() {
        let fleet = fleet_with(&[100.0, 50.0]);
        // Snapshot taken while the fleet is full.
        let (candidates, _) = fleet.candidate_snapshot();
        let order: Vec<DerId> = candidates.into_iter().map(|(id, _)| id).collect();
        // A racing allocation drains most of the fleet before the walk runs.
        fleet.try_allocate(&order, 140.0).unwrap();
        let capacities = |fleet: &FleetRegistry| {
            let mut pairs: Vec<(DerId, f64)> = fleet
                .snapshot()
                .into_iter()
                .map(|u| (u.id.clone(), u.available()))
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            pairs
        };
        let before = capacities(&fleet);
        // The stale walk cannot cover 120 anymore and must restore everything.
        let err = fleet.try_allocate(&order, 120.0).unwrap_err();
        assert!(err > 0.0);
        assert_eq!(before, capacities(&fleet));
    }

    #[test]
    fn replenish_skips_offline_and_revives_depleted() {
        let fleet = fleet_with(&[50.0, 50.0]);
        let ids: Vec<DerId> = fleet.snapshot().iter().map(|u| u.id.clone()).collect();
        fleet.try_allocate(&ids, 100.0).unwrap();
        fleet.set_offline(&ids[1]).unwrap();
        let snapshot = fleet.replenish_all(10.0);
        assert_eq!(snapshot.total_capacity, 50.0);
        assert_eq!(snapshot.total_available, 10.0);
        let revived = fleet.get(&ids[0]).unwrap();
        assert_eq!(revived.available(), 10.0);
        assert_eq!(revived.state(), DerState::Available);
        let offline = fleet.get(&ids[1]).unwrap();
        assert_eq!(offline.available(), 0.0);
        assert_eq!(offline.state(), DerState::Offline);
    }
}
