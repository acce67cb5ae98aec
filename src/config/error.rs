//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A disabled-metric or disabled-job pattern is not a valid regex.
    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },

    /// A summary quantile lies outside `[0, 1]`.
    #[error("quantile {value} is outside [0, 1]")]
    InvalidQuantile {
        /// The offending quantile.
        value: f64,
    },

    /// The collection period is zero.
    #[error("collecting_metrics_period_in_seconds must be greater than zero")]
    InvalidPeriod,
}
