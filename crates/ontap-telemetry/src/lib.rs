//! Prometheus metrics and structured logging for OnTap.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus metrics for bootstrap runs, poll cycles and fetch failures

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{GaugeGuard, Metrics};
