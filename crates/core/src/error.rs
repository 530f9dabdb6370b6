//! Domain errors shared by the workflow rules, validators and the API layer.

use crate::types::DbId;
use crate::workflow::InternalStatus;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The request conflicts with the current state of a record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A tax year cannot move straight from `from` to `to`.
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition {
        from: InternalStatus,
        to: InternalStatus,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is signed in but lacks the role or permission flag.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
