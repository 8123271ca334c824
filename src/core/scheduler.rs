//! Scheduler loops and the dispatch system that owns them.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::allocation::AllocationEngine;
use super::error::DispatchError;
use super::event::{DemandEvent, EventId};
use super::executor::{EventExecutor, SimulatedExecutor};
use super::fleet::FleetRegistry;
use super::metrics::{EventReport, MetricsSink};
use super::replenish::Replenisher;
use crate::config::DispatchConfig;
use crate::infra::queue::PriorityEventQueue;

/// Abstraction for spawning scheduler tasks on a runtime.
pub trait Spawn {
    /// Spawn an async task.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Cooperative shutdown signal shared by scheduler loops and the
/// replenishment cycle.
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    /// Create an untriggered signal.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            triggered: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Trigger the signal, waking every waiter.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Suspend until the signal triggers. Returns immediately if it already
    /// has.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a trigger between the check
        // and the await cannot be missed.
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

/// The dispatch system: queue, fleet, allocation engine, scheduler loops,
/// and replenishment cycle under one shutdown signal.
///
/// Producers call [`submit`](Self::submit) concurrently; each submitted event
/// is dequeued exactly once by exactly one scheduler loop and resolved exactly
/// once as completed or failed, reported through the metrics sink either way.
pub struct DispatchSystem {
    config: DispatchConfig,
    fleet: Arc<FleetRegistry>,
    queue: Arc<PriorityEventQueue>,
    engine: AllocationEngine,
    executor: Arc<dyn EventExecutor>,
    metrics: Option<Arc<Mutex<Box<dyn MetricsSink>>>>,
    shutdown: Arc<Shutdown>,
    completed: Mutex<HashSet<EventId>>,
    submitted: AtomicU64,
    resolved: AtomicU64,
}

impl DispatchSystem {
    /// Create a system over an existing fleet, executing events with the
    /// default [`SimulatedExecutor`].
    pub fn new(config: DispatchConfig, fleet: Arc<FleetRegistry>) -> Self {
        let engine = AllocationEngine::new(Arc::clone(&fleet));
        Self {
            config,
            fleet,
            queue: Arc::new(PriorityEventQueue::new()),
            engine,
            executor: Arc::new(SimulatedExecutor),
            metrics: None,
            shutdown: Arc::new(Shutdown::new()),
            completed: Mutex::new(HashSet::new()),
            submitted: AtomicU64::new(0),
            resolved: AtomicU64::new(0),
        }
    }

    /// Substitute the execution seam.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn EventExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Attach a metrics sink for outcome and fleet reports.
    #[must_use]
    pub fn with_metrics(mut self, sink: Box<dyn MetricsSink>) -> Self {
        self.metrics = Some(Arc::new(Mutex::new(sink)));
        self
    }

    /// The fleet registry this system dispatches against.
    pub fn fleet(&self) -> &Arc<FleetRegistry> {
        &self.fleet
    }

    /// Number of events currently queued.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Events submitted but not yet resolved.
    pub fn pending_events(&self) -> u64 {
        self.submitted
            .load(Ordering::Acquire)
            .saturating_sub(self.resolved.load(Ordering::Acquire))
    }

    /// Identifiers of every event that completed successfully.
    pub fn completed_event_ids(&self) -> HashSet<EventId> {
        self.completed.lock().clone()
    }

    /// Submit an event for dispatch. Safe to call from any number of
    /// concurrent producers; never blocks and never drops an accepted event.
    ///
    /// Fails with [`DispatchError::ShutdownInProgress`] once the system is
    /// draining.
    pub fn submit(&self, event: DemandEvent) -> Result<(), DispatchError> {
        if self.shutdown.is_triggered() {
            return Err(DispatchError::ShutdownInProgress);
        }
        tracing::info!(
            event_id = %event.id,
            priority = ?event.priority,
            requirement = event.requirement,
            "event submitted"
        );
        self.submitted.fetch_add(1, Ordering::AcqRel);
        self.queue.enqueue(event);
        Ok(())
    }

    /// Spawn the configured number of scheduler loops and the replenishment
    /// cycle onto the given runtime.
    pub fn start<S: Spawn>(self: Arc<Self>, spawner: &S) {
        for worker_id in 0..self.config.worker_count {
            let system = Arc::clone(&self);
            spawner.spawn(async move { system.worker_loop(worker_id).await });
        }
        let replenisher = Replenisher::new(
            Arc::clone(&self.fleet),
            self.config.replenish_period(),
            self.config.replenish_amount,
            Arc::clone(&self.shutdown),
            self.metrics.clone(),
        );
        spawner.spawn(replenisher.run());
    }

    /// One scheduler loop: dequeue, allocate, execute, release, resolve.
    ///
    /// Exactly one loop processes any given event, and the outcome is
    /// reported before the loop dequeues again.
    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        tracing::debug!(worker_id, "scheduler loop started");
        let poll = self.config.poll_interval();
        loop {
            if self.shutdown.is_triggered() {
                break;
            }
            let Some(event) = self.queue.dequeue_wait(poll).await else {
                continue;
            };
            tracing::debug!(worker_id, event_id = %event.id, "event dequeued");
            self.process_event(event).await;
        }
        tracing::debug!(worker_id, "scheduler loop stopped");
    }

    async fn process_event(&self, event: DemandEvent) {
        let started = tokio::time::Instant::now();

        let record = match self.engine.allocate(&event) {
            Ok(record) => record,
            Err(err) => {
                tracing::info!(event_id = %event.id, error = %err, "event failed at allocation");
                self.resolve(&event, false, started.elapsed().as_secs_f64());
                return;
            }
        };

        let outcome = self.executor.execute(&event).await;
        // Capacity goes back on every exit path; leaking an allocation on an
        // execution failure is an invariant violation.
        self.engine.release(record);

        match outcome {
            Ok(()) => {
                self.completed.lock().insert(event.id);
                self.resolve(&event, true, started.elapsed().as_secs_f64());
            }
            Err(err) => {
                tracing::warn!(event_id = %event.id, error = %err, "event failed at execution");
                self.resolve(&event, false, started.elapsed().as_secs_f64());
            }
        }
    }

    /// Report the terminal outcome of an event. Called exactly once per
    /// submitted event.
    fn resolve(&self, event: &DemandEvent, success: bool, response_time_secs: f64) {
        let report = EventReport {
            event_id: event.id,
            priority: event.priority,
            success,
            response_time_secs,
            utilization_at_completion: self.fleet.utilization(),
            event_type: event.event_type.clone(),
        };
        if let Some(sink) = &self.metrics {
            sink.lock().record_event(report);
        }
        self.resolved.fetch_add(1, Ordering::AcqRel);
        tracing::info!(
            event_id = %event.id,
            success,
            response_time_secs,
            "event resolved"
        );
    }

    /// Drain and stop: reject new submissions, let in-flight allocations
    /// complete and release, resolve still-queued events as failed, and stop
    /// the replenishment cycle. No allocation is left un-released.
    pub async fn shutdown(&self) {
        tracing::info!("shutdown requested, draining");
        self.shutdown.trigger();
        let poll = self.config.poll_interval();
        loop {
            // Queued events are resolved as failed rather than dropped.
            while let Some(event) = self.queue.try_dequeue() {
                tracing::info!(event_id = %event.id, "event failed: shutdown in progress");
                self.resolve(&event, false, 0.0);
            }
            if self.pending_events() == 0 {
                break;
            }
            tokio::time::sleep(poll).await;
        }
        tracing::info!("drain complete");
    }
}
