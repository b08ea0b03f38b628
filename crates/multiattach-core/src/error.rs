//! Error types for multiattach.

use thiserror::Error;

/// Result type alias using multiattach's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for multiattach operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Registry entry targets a model without table storage
    #[error("Model \"{0}\" does not store information to an SQL table.")]
    UnsupportedModel(String),

    /// A registry entry already exists for the model
    #[error("Multiple Attachment must be unique per model: {0}")]
    UniquenessViolation(String),

    /// The attachment list view used by the wizard is not installed
    #[error("Attachment reference view is not installed")]
    MissingReferenceView,

    /// Model identifier is not known to the model catalog
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Map a store write error, turning unique-constraint failures into
/// [`Error::UniquenessViolation`] for the given model.
pub fn map_unique_violation(err: sqlx::Error, model: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::UniquenessViolation(model.to_string());
        }
    }
    Error::Database(err)
}
