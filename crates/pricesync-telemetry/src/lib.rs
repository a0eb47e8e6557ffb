//! Prometheus metrics and structured logging for pricesync.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_logging_with_level, DEFAULT_FILTER};
pub use metrics::Metrics;
