//! Structured logging initialization.
//!
//! JSON output by default for production, human-readable output for
//! development. The filter honors `RUST_LOG` when set, falling back to the
//! configured level.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Logging initialization errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log-level filter could not be parsed.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
    /// A global subscriber was already installed.
    #[error("failed to install logging subscriber: {0}")]
    Init(String),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled at all.
    pub enabled: bool,
    /// Fallback log level when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON-formatted output.
    pub json_format: bool,
    /// Include the module path in events.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Development preset: human-readable output at debug level.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            include_target: true,
        }
    }
}

/// Installs the global tracing subscriber.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?;

    if config.json_format {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.include_target)
            .json()
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.include_target)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;
    }
    Ok(())
}
