//! Telemetry: structured logging and metrics.
//!
//! - **Logging**: `tracing-subscriber` with JSON, pretty or compact output
//! - **Metrics**: counters, gauges and histograms through the `metrics` facade
//!
//! # Example
//!
//! ```rust,no_run
//! use wsaccess_core::telemetry::{init_telemetry, LoggingConfig};
//!
//! init_telemetry(&LoggingConfig::default()).expect("Failed to initialize telemetry");
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{describe_metrics, RefreshTimer};

/// Install logging and register metric descriptions.
///
/// Call once at startup.
pub fn init_telemetry(config: &LoggingConfig) -> anyhow::Result<()> {
    init_logging(config)?;
    describe_metrics();
    Ok(())
}
