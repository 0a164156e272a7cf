//! Database error types for tender-db.

use tender_core::errors::CoreError;
use thiserror::Error;

/// Errors from store operations.
///
/// Any error returned from inside a transaction means the transaction was
/// rolled back.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The request is malformed or references ids that do not resolve.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The addressed entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The request conflicts with current state (terminal alert, duplicate offer).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in the store).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<CoreError> for DatabaseError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::NotFound { entity_type, id } => Self::NotFound {
                entity: entity_type,
                id,
            },
            CoreError::InvalidTransition {
                entity_type,
                id,
                from,
                to,
            } => Self::Conflict(format!("{entity_type} {id} cannot move from {from} to {to}")),
            CoreError::Other(e) => Self::Other(e),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(err.into())
    }
}
