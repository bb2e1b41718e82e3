//! Observability for childkeys.
//!
//! This crate provides:
//! - `init_logging` / `LoggingConfig` - `tracing` subscriber setup
//! - `MetricsCollector` / `FetchMetrics` - Per-call attempt timings

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
