//! # DER Dispatch
//!
//! A concurrent dispatch scheduler for fleets of distributed energy resources
//! (DERs) serving priority-classified demand events under finite,
//! time-varying capacity.
//!
//! The core is the scheduling and resource-allocation engine:
//!
//! - **Single global priority queue**: strict cross-class ordering, FIFO
//!   within a class. A higher-priority event is never dequeued after an
//!   earlier-arrived lower-priority one when both are queued.
//! - **Greedy allocation with rollback**: candidates are walked
//!   largest-available-first; if a concurrent allocation drains capacity
//!   between snapshot and walk, every deduction is rolled back and the
//!   attempt fails as a `PartialAllocationRace` rather than being retried.
//! - **Concurrent scheduler loops**: each loop dequeues one event at a time,
//!   allocates, simulates the dispatch dwell, releases, and reports the
//!   outcome before dequeuing again. Capacity is released on every exit
//!   path, including execution failures.
//! - **Replenishment cycle**: a background timer restores capacity to
//!   non-offline units independently of queue activity, racing allocation
//!   through the same registry lock.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use der_dispatch::config::DispatchConfig;
//! use der_dispatch::core::{DemandEvent, DispatchSystem, EventPriority};
//! use der_dispatch::runtime::TokioSpawner;
//!
//! let config = DispatchConfig::default();
//! let fleet = config.build_fleet()?;
//! let system = Arc::new(DispatchSystem::new(config, fleet));
//! Arc::clone(&system).start(&TokioSpawner::current());
//!
//! let event = DemandEvent::new(
//!     EventPriority::Critical,
//!     120.0,
//!     Duration::from_millis(250),
//!     "grid_stability",
//! )?;
//! system.submit(event)?;
//! // ... later:
//! system.shutdown().await;
//! ```
//!
//! Capacity conservation holds at every lock boundary: over non-offline
//! units, `sum(capacity - available)` always equals the total of outstanding
//! allocation amounts, and `0 <= available <= capacity` for every unit.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Core scheduling: fleet, events, allocation, scheduler loops, replenishment.
pub mod core;
/// Configuration models for fleet and scheduler construction.
pub mod config;
/// Infrastructure adapters for event queues.
pub mod infra;
/// Runtime adapters for task spawning.
pub mod runtime;
/// Shared utilities.
pub mod util;
