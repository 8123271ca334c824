//! Infrastructure adapters for the dispatch core.

/// Queue backends for demand events.
pub mod queue;
