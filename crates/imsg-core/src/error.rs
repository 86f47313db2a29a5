//! Typed error types for the imsg-core service surface.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the imsg-core service surface.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The chat database file does not exist at the given path.
    #[error("No Messages database at {path}")]
    DatabaseNotFound { path: String },

    /// A message row was not found, or it has no GUID to correlate on.
    #[error("Message not found: {rowid}")]
    MessageNotFound { rowid: i64 },

    /// An internal storage or database error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
