//! Push-based observability for stockcast
//!
//! Outbound data only: Prometheus metrics are collected during a run and
//! emitted once at the end as a JSON log line and, optionally, a textfile.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::{MetricsReporter, RunSummary};
