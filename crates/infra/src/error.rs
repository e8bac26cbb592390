//! Orchestrator error model.

use thiserror::Error;

use crudguard_auth::{Action, AuthzError};
use crudguard_core::DomainError;

use crate::store::StoreError;

/// Failure of a CRUD operation (or of one record inside a batch).
///
/// Whole-call failures (`MissingCredentials`, `Unauthorized`, `UnknownModel`)
/// are raised before any storage access. Everything else may also appear at a
/// single position/key of a batch result.
#[derive(Debug, Error)]
pub enum CrudError {
    #[error("MissingCredentials.")]
    MissingCredentials,

    #[error("Unauthorized model action \"{model}:{action}:{role}\"")]
    Unauthorized {
        model: String,
        action: Action,
        role: String,
    },

    /// Owner-restricted access (or owner injection) without a caller identifier.
    #[error("Unauthorized: credentials field \"{field}\" must be set to scope \"{model}\" records to their owner")]
    UnresolvedOwner { model: String, field: String },

    #[error("UndefinedProperties : {0}")]
    UndefinedProperties(String),

    #[error("UnknownModel '{0}'")]
    UnknownModel(String),

    #[error("CloneMissingSrcKey : a source key must be given")]
    CloneMissingSrcKey,

    #[error("CloneSrcNotFound : no record source found with the id \"{0}\"")]
    CloneSrcNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A model hook rejected the record.
    #[error("hook failed: {0}")]
    Hook(#[source] anyhow::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CrudError {
    pub fn undefined_properties(msg: impl Into<String>) -> Self {
        Self::UndefinedProperties(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Authorization failures, whatever their cause.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::UnresolvedOwner { .. })
    }
}

impl From<AuthzError> for CrudError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::MissingCredentials => CrudError::MissingCredentials,
            AuthzError::Forbidden {
                model,
                action,
                role,
            } => CrudError::Unauthorized {
                model,
                action,
                role,
            },
            AuthzError::UnresolvedOwner { model, field } => {
                CrudError::UnresolvedOwner { model, field }
            }
        }
    }
}

impl From<DomainError> for CrudError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidKey(msg) => {
                CrudError::UndefinedProperties(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_maps_to_unauthorized_with_same_message() {
        let err: CrudError = AuthzError::Forbidden {
            model: "Task".into(),
            action: Action::Update,
            role: "guest".into(),
        }
        .into();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Unauthorized model action \"Task:update:guest\"");
    }

    #[test]
    fn unresolved_owner_counts_as_unauthorized() {
        let err: CrudError = AuthzError::UnresolvedOwner {
            model: "Task".into(),
            field: "id".into(),
        }
        .into();
        assert!(err.is_unauthorized());
        assert!(!CrudError::MissingCredentials.is_unauthorized());
    }

    #[test]
    fn domain_errors_become_undefined_properties() {
        let err: CrudError = DomainError::validation("record cannot be null").into();
        assert!(matches!(err, CrudError::UndefinedProperties(ref m) if m.contains("null")));
    }
}
