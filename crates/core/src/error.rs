//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only (validation, invariants, conflicts).
/// Storage and transport failures are modelled by the crates that own them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more input fields failed validation.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. duplicate SKU).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    pub fn validation_many(messages: Vec<String>) -> Self {
        Self::Validation(messages)
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Validation messages carried by this error, if any.
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Validation(messages) => messages,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_joins_messages() {
        let err = DomainError::validation_many(vec![
            "name is required".to_string(),
            "basePrice must be >= 0".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: name is required; basePrice must be >= 0"
        );
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn non_validation_errors_carry_no_messages() {
        assert!(DomainError::not_found().messages().is_empty());
        assert!(DomainError::conflict("dup").messages().is_empty());
    }
}
