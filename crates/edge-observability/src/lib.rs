//! Observability for cache decisions.
//!
//! This crate provides:
//! - `DecisionLogger` - Structured logging of a request's cache-control trail
//! - `LogEntry` / `LogLevel` / `LogFormat` - JSON and human log records

mod logging;

pub use logging::*;

// Re-export RequestId from edge-core for convenience
pub use edge_core::RequestId;
