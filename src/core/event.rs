//! Demand events and their priority classification.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DispatchError;
use crate::util::clock::now_ms;

/// Unique identifier for a demand event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generate a fresh random identifier.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Priority class of a demand event.
///
/// A closed, totally ordered set: smaller rank means higher priority, and the
/// derived `Ord` follows declaration order, so `Critical < High < Medium < Low`.
/// Queue comparison over this enum is exhaustive by construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    /// Grid-stability emergencies; always served first.
    Critical,
    /// Time-sensitive demand (e.g. weather response).
    High,
    /// Standard demand.
    Medium,
    /// Routine, deferrable demand.
    Low,
}

impl EventPriority {
    /// All priority classes, highest first.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Numeric rank; smaller is higher priority.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::High => 2,
            Self::Medium => 3,
            Self::Low => 4,
        }
    }
}

/// An immutable, priority-classified demand for fleet capacity.
///
/// Constructed once by a producer and never mutated afterwards. Queue ordering
/// uses `priority` only; arrival order breaks ties. The deadline is advisory
/// metadata for metrics, not enforced by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandEvent {
    /// Unique event identifier.
    pub id: EventId,
    /// Priority class used for queue ordering.
    pub priority: EventPriority,
    /// Creation timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
    /// Advisory deadline in milliseconds since epoch.
    pub deadline_ms: Option<u128>,
    /// Capacity this event demands from the fleet. Always positive.
    pub requirement: f64,
    /// Simulated dispatch dwell time in milliseconds.
    pub duration_ms: u64,
    /// Opaque classification tag (e.g. "grid_stability", "weather_response").
    pub event_type: String,
}

impl DemandEvent {
    /// Create a new demand event with a fresh identifier.
    ///
    /// Fails with [`DispatchError::InvalidConfig`] when the requirement is not
    /// strictly positive (NaN included).
    pub fn new(
        priority: EventPriority,
        requirement: f64,
        duration: Duration,
        event_type: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        if !(requirement > 0.0) {
            return Err(DispatchError::InvalidConfig(format!(
                "event requirement must be positive, got {requirement}"
            )));
        }
        Ok(Self {
            id: EventId::new(),
            priority,
            created_at_ms: now_ms(),
            deadline_ms: None,
            requirement,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            event_type: event_type.into(),
        })
    }

    /// Attach an advisory deadline, milliseconds since epoch.
    #[must_use]
    pub fn with_deadline(mut self, deadline_ms: u128) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    /// Simulated dispatch dwell time.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_is_rank_order() {
        assert!(EventPriority::Critical < EventPriority::High);
        assert!(EventPriority::High < EventPriority::Medium);
        assert!(EventPriority::Medium < EventPriority::Low);
        assert_eq!(EventPriority::Critical.rank(), 1);
        assert_eq!(EventPriority::Low.rank(), 4);
    }

    #[test]
    fn rejects_non_positive_requirement() {
        assert!(DemandEvent::new(
            EventPriority::Low,
            0.0,
            Duration::from_millis(10),
            "routine"
        )
        .is_err());
        assert!(DemandEvent::new(
            EventPriority::Low,
            -5.0,
            Duration::from_millis(10),
            "routine"
        )
        .is_err());
        assert!(DemandEvent::new(
            EventPriority::Low,
            f64::NAN,
            Duration::from_millis(10),
            "routine"
        )
        .is_err());
    }

    #[test]
    fn priority_serde_round_trip() {
        let json = serde_json::to_string(&EventPriority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let back: EventPriority = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EventPriority::Critical);
    }
}
