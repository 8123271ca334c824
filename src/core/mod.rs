//! The dispatch core: fleet, events, allocation, scheduling, replenishment.

pub mod allocation;
pub mod der;
pub mod error;
pub mod event;
pub mod executor;
pub mod fleet;
pub mod metrics;
pub mod replenish;
pub mod scheduler;

pub use allocation::{AllocationEngine, AllocationRecord};
pub use der::{DerId, DerState, ResourceUnit};
pub use error::{AppResult, DispatchError};
pub use event::{DemandEvent, EventId, EventPriority};
pub use executor::{EventExecutor, ExecutionError, SimulatedExecutor};
pub use fleet::FleetRegistry;
pub use metrics::{EventReport, FleetSnapshot, InMemoryMetricsSink, MetricsSink};
pub use replenish::Replenisher;
pub use scheduler::{DispatchSystem, Shutdown, Spawn};
