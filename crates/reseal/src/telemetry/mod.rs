//! Telemetry initialisation for the batch tool.
//!
//! Structured JSON logs go to stderr so that stdout carries only the run
//! summary. `RUST_LOG` overrides the configured level.
//!
//! Key material and record content must never appear in a log field.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber at the configured log level.
///
/// # Errors
///
/// Returns an error if the subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise reseal tracing subscriber: {e}"))
}
