//! A single distributed energy resource and its dispatch state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DispatchError;

/// Tolerance for floating-point capacity comparisons.
pub(crate) const CAPACITY_EPSILON: f64 = 1e-9;

/// Identifier of a resource unit within the fleet.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DerId(pub String);

impl fmt::Display for DerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Dispatch state of a resource unit.
///
/// Legal transitions:
/// - `Available -> Dispatched` when an allocation leaves available capacity > 0
/// - `Available -> Depleted` when an allocation drains available capacity to 0
/// - `Dispatched | Depleted -> Available` when a release or replenishment
///   restores available capacity above 0
/// - `Offline` is administrative; offline units take no part in allocation or
///   replenishment and keep their state until brought back online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerState {
    /// Unit has its full headroom and no outstanding dispatch.
    Available,
    /// Unit holds at least one allocation but retains spare capacity.
    Dispatched,
    /// Unit's available capacity is fully consumed.
    Depleted,
    /// Unit is administratively removed from dispatch and replenishment.
    Offline,
}

/// A capacity-bearing dispatch target (e.g. a battery).
///
/// Owned exclusively by the [`FleetRegistry`](super::fleet::FleetRegistry);
/// every mutation happens under the registry lock. The invariant
/// `0 <= available <= capacity` holds at all times: `deduct` never takes more
/// than is available and `credit` clamps at total capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUnit {
    /// Unit identifier, unique within the fleet.
    pub id: DerId,
    /// Opaque location tag.
    pub location: String,
    capacity: f64,
    available: f64,
    state: DerState,
}

impl ResourceUnit {
    /// Create a unit at full available capacity.
    ///
    /// Fails when `capacity` is not strictly positive.
    pub fn new(
        id: impl Into<DerId>,
        capacity: f64,
        location: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        if !(capacity > 0.0) {
            return Err(DispatchError::InvalidConfig(format!(
                "unit capacity must be positive, got {capacity}"
            )));
        }
        Ok(Self {
            id: id.into(),
            location: location.into(),
            capacity,
            available: capacity,
            state: DerState::Available,
        })
    }

    /// Total (fixed) capacity.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Currently available capacity.
    pub fn available(&self) -> f64 {
        self.available
    }

    /// Current dispatch state.
    pub fn state(&self) -> DerState {
        self.state
    }

    /// Whether the unit is administratively offline.
    pub fn is_offline(&self) -> bool {
        self.state == DerState::Offline
    }

    /// Deduct an allocation from available capacity and transition state.
    ///
    /// Callers must hold the registry lock and never ask for more than
    /// `available`; the amount is clamped as a last line of defense so the
    /// invariant cannot be violated by float drift.
    pub(crate) fn deduct(&mut self, amount: f64) {
        debug_assert!(amount >= 0.0 && amount <= self.available + CAPACITY_EPSILON);
        self.available = (self.available - amount).max(0.0);
        if self.state != DerState::Offline {
            self.state = if self.available > CAPACITY_EPSILON {
                DerState::Dispatched
            } else {
                DerState::Depleted
            };
        }
    }

    /// Credit capacity back (release or replenishment), clamped to total
    /// capacity, and transition state. Offline units keep their state.
    pub(crate) fn credit(&mut self, amount: f64) {
        debug_assert!(amount >= 0.0);
        self.available = (self.available + amount).min(self.capacity);
        if self.state != DerState::Offline {
            self.state = if self.available > CAPACITY_EPSILON {
                DerState::Available
            } else {
                DerState::Depleted
            };
        }
    }

    /// Administratively take the unit offline.
    pub(crate) fn set_offline(&mut self) {
        self.state = DerState::Offline;
    }

    /// Bring the unit back online; state is recomputed from available capacity.
    pub(crate) fn set_online(&mut self) {
        self.state = if self.available > CAPACITY_EPSILON {
            DerState::Available
        } else {
            DerState::Depleted
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_unit_starts_full_and_available() {
        let unit = ResourceUnit::new("der_0", 100.0, "location_0").unwrap();
        assert_eq!(unit.capacity(), 100.0);
        assert_eq!(unit.available(), 100.0);
        assert_eq!(unit.state(), DerState::Available);
    }

    #[test]
    fn rejects_non_positive_capacity() {
        assert!(ResourceUnit::new("der_0", 0.0, "x").is_err());
        assert!(ResourceUnit::new("der_0", -1.0, "x").is_err());
    }

    #[test]
    fn partial_deduct_dispatches_full_deduct_depletes() {
        let mut unit = ResourceUnit::new("der_0", 100.0, "x").unwrap();
        unit.deduct(40.0);
        assert_eq!(unit.available(), 60.0);
        assert_eq!(unit.state(), DerState::Dispatched);
        unit.deduct(60.0);
        assert_eq!(unit.available(), 0.0);
        assert_eq!(unit.state(), DerState::Depleted);
    }

    #[test]
    fn credit_clamps_to_capacity_and_restores_available() {
        let mut unit = ResourceUnit::new("der_0", 50.0, "x").unwrap();
        unit.deduct(50.0);
        assert_eq!(unit.state(), DerState::Depleted);
        unit.credit(10.0);
        assert_eq!(unit.available(), 10.0);
        assert_eq!(unit.state(), DerState::Available);
        unit.credit(1000.0);
        assert_eq!(unit.available(), 50.0);
        assert_eq!(unit.state(), DerState::Available);
    }

    #[test]
    fn offline_state_survives_credit() {
        let mut unit = ResourceUnit::new("der_0", 50.0, "x").unwrap();
        unit.deduct(20.0);
        unit.set_offline();
        unit.credit(20.0);
        assert_eq!(unit.available(), 50.0);
        assert_eq!(unit.state(), DerState::Offline);
        unit.set_online();
        assert_eq!(unit.state(), DerState::Available);
    }
}
