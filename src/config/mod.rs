//! Configuration models for the dispatch system.

pub mod dispatch;

pub use dispatch::DispatchConfig;
