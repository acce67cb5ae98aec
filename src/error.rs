//! Error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while computing or exposing metrics.
#[derive(Debug, Error)]
pub enum Error {
    /// A label value array did not match the arity of the collector's label
    /// schema.
    #[error("incorrect number of labels: expected {expected}, got {actual}")]
    LabelArity {
        /// Number of label names in the schema.
        expected: usize,
        /// Number of label values supplied.
        actual: usize,
    },

    /// Host code panicked while one entity was being read.
    #[error("panicked while collecting metrics for '{entity}'")]
    EntityPanicked {
        /// Full name of the entity.
        entity: String,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The exposition could not be written.
    #[error("failed to format metrics: {0}")]
    Format(#[from] std::fmt::Error),
}
