//! Error types for dispatch operations.

use thiserror::Error;

/// Errors produced by the dispatch core.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The fleet's aggregate available capacity cannot cover the requirement.
    /// Returned by the fast-fail check before any mutation occurs.
    #[error("insufficient aggregate capacity: required {required:.2}, available {available:.2}")]
    InsufficientAggregateCapacity {
        /// Capacity the event asked for.
        required: f64,
        /// Aggregate available capacity at snapshot time.
        available: f64,
    },
    /// The candidate snapshot raced a concurrent allocation and the walk came
    /// up short. All partial deductions have been rolled back.
    #[error("partial allocation race: {remaining:.2} unallocated after walking all candidates")]
    PartialAllocationRace {
        /// Capacity still unallocated when the walk exhausted its candidates.
        remaining: f64,
    },
    /// Unexpected engine-local failure (e.g. a non-positive requirement).
    #[error("allocation engine error: {0}")]
    AllocationEngine(String),
    /// The system is draining; no new events are accepted.
    #[error("shutdown in progress")]
    ShutdownInProgress,
    /// No resource unit registered under the given identifier.
    #[error("unknown resource unit: {0}")]
    UnknownUnit(String),
    /// A resource unit with the given identifier is already registered.
    #[error("duplicate resource unit: {0}")]
    DuplicateUnit(String),
    /// Invalid configuration or construction parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
