//! Error types for repository operations.

use thiserror::Error;

/// Repository-specific errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx, surfaced unmodified.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No row matched a single-row lookup.
    #[error("{model} {detail} not found")]
    NotFound {
        /// Name of the model that was queried.
        model: &'static str,
        /// Description of the lookup (`with id 7`, `with attributes {..}`).
        detail: String,
    },

    /// The model has no column with this name.
    #[error("{model} has no attribute '{field}'")]
    UnknownField {
        /// Name of the model.
        model: &'static str,
        /// The offending field name.
        field: String,
    },

    /// The model has no relation with this name.
    #[error("{model} has no relationship '{relation}'")]
    UnknownRelation {
        /// Name of the model.
        model: &'static str,
        /// The offending relation name.
        relation: String,
    },

    /// A value that the lookup cannot use.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RepositoryError {
    /// Returns whether this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
