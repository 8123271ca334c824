//! Queue backends.

/// In-memory single global priority queue.
pub mod memory;

pub use memory::PriorityEventQueue;
