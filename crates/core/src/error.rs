use thiserror::Error;

use crate::document::validate::ValidationError;

/// Errors surfaced by the versioning engine and its stores.
#[derive(Debug, Error)]
pub enum VersioningError {
    /// A referenced document or snapshot does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The write would leave a document with zero or several current
    /// snapshots. Rejected before anything is committed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Transient store failure. Nothing was committed; safe to retry.
    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VersioningError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl From<sqlx::Error> for VersioningError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::NotFound {
                kind: "row",
                id: String::new(),
            },
            other => Self::Persistence(other.to_string()),
        }
    }
}

pub type VersioningResult<T> = Result<T, VersioningError>;
