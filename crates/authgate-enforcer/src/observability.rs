//! Logging setup and metric registration.
//!
//! Uses `tracing-subscriber` for structured logging. When JSON formatting
//! is enabled, log entries are emitted as one JSON object per line; text
//! mode uses the pretty formatter for development.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration for structured logging.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Whether to use JSON format (true) or text format (false)
    pub json_format: bool,
    /// The default log level if RUST_LOG is not set
    pub default_level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            default_level: Level::INFO,
        }
    }
}

impl LoggingConfig {
    /// JSON output for production.
    pub fn json() -> Self {
        Self {
            json_format: true,
            ..Default::default()
        }
    }

    /// Text output for development.
    pub fn text() -> Self {
        Self {
            json_format: false,
            ..Default::default()
        }
    }

    /// Sets the default log level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }
}

/// Initializes the logging subsystem.
///
/// Should be called once at application startup; subsequent calls have no
/// effect (the subscriber is global).
pub fn init_logging(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));

    if config.json_format {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true));
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_target(true));
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Registers metric descriptions with the installed recorder.
///
/// Optional; call once during startup for better documentation in
/// Prometheus/Grafana.
///
/// # Metrics Registered
///
/// - `authgate_cache_hits_total` - decision cache hits
/// - `authgate_cache_misses_total` - decision cache misses
/// - `authgate_batch_shard_duration_seconds` - per-shard batch latency
pub fn register_metrics() {
    metrics::describe_counter!(
        "authgate_cache_hits_total",
        "Total number of decision cache hits"
    );
    metrics::describe_counter!(
        "authgate_cache_misses_total",
        "Total number of decision cache misses"
    );
    metrics::describe_histogram!(
        "authgate_batch_shard_duration_seconds",
        "Wall-clock latency of one batch shard worker"
    );
}
