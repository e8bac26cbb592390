//! Value-level error model.

use thiserror::Error;

/// Result type used by the pure value layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Failure while interpreting caller-supplied values.
///
/// Keep this focused on deterministic shape/parse failures. Authorization and
/// storage concerns have their own error types in the crates that own them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A payload did not have the expected shape (e.g. null where a record is required).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A primary-key value could not be interpreted as a record key.
    #[error("invalid record key: {0}")]
    InvalidKey(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }
}
