//! Domain error types.
//!
//! These errors represent validation failures at the boundary where raw
//! source data becomes domain values. They are distinct from API/IO errors.

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Direction code outside the 0/1 encoding
    #[error("invalid direction code: {0}")]
    InvalidDirection(i64),

    /// A required name or identifier was empty
    #[error("empty {0}")]
    Empty(&'static str),
}
