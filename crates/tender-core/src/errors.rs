//! Cross-cutting error types.
//!
//! Store-level errors (`DatabaseError`) live in `tender-db`; configuration
//! errors live in `tender-config`. Everything converges into `anyhow` in the
//! `tnd` binary.

use thiserror::Error;

/// Errors that can be raised by any tender crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (missing ids, bad payload shape).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
