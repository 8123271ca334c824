//! Event execution seam.

use async_trait::async_trait;
use thiserror::Error;

use super::event::DemandEvent;

/// Failure inside the execution step of an event.
///
/// Stays inside the scheduler loop: the loop releases the held allocation and
/// resolves the event as failed; the error never escapes as a panic.
#[derive(Debug, Error)]
#[error("execution failed: {0}")]
pub struct ExecutionError(pub String);

/// Abstraction over the execution of a dequeued, allocated event.
///
/// The default implementation models dispatch dwell time with a timer; tests
/// substitute executors that record ordering or fail on demand.
#[async_trait]
pub trait EventExecutor: Send + Sync + 'static {
    /// Run the event to completion or failure.
    async fn execute(&self, event: &DemandEvent) -> Result<(), ExecutionError>;
}

/// Executor that suspends for the event's duration.
///
/// The sleep goes through `tokio::time`, so tests running under paused time
/// advance it virtually instead of waiting on the wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedExecutor;

#[async_trait]
impl EventExecutor for SimulatedExecutor {
    async fn execute(&self, event: &DemandEvent) -> Result<(), ExecutionError> {
        tokio::time::sleep(event.duration()).await;
        Ok(())
    }
}
