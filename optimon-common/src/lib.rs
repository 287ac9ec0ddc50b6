//! Optimon Common Library
//!
//! Shared types and utilities for the optimon device collectors:
//!
//! - [`output`] - Canonical instance/metric records and the discovery and
//!   collection line formats
//! - [`config`] - Configuration loading (JSON5 format) and logging settings
//! - [`error`] - Error types
//!
//! Collectors write data lines to stdout and diagnostics to stderr; the two
//! streams are never mixed.

pub mod config;
pub mod error;
pub mod output;

// Re-export commonly used types at the crate root
pub use config::{LogFormat, LoggingConfig, load_config, parse_config};
pub use error::{Error, Result};
pub use output::{
    Instance, MetricSample, collapse_whitespace, format_collection_line, format_discovery_line,
    sanitize_instance_id, sanitize_property_key, write_collection, write_discovery,
};

/// Initialize tracing with the given configuration.
///
/// Diagnostics go to stderr so the data line formats keep exclusive use of
/// stdout. Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
