//! Error taxonomy for engine operations.

use thiserror::Error;

/// Failure modes surfaced by engine operations.
///
/// Callers can map these onto transport-level responses: `Validation` and
/// `StateConflict` are caller mistakes, `Store` is an internal fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Input failed structural validation (bad coordinates, unknown class).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The caller is not the owner of the entity being acted on.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The entity exists but is in a state that forbids the operation.
    #[error("conflicting state for {entity}: currently {actual}")]
    StateConflict { entity: String, actual: String },

    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store could not complete the operation.
    #[error("store failure: {0}")]
    Store(String),
}
