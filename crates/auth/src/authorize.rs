use serde_json::Value;
use thiserror::Error;

use crate::{AccessPolicy, Action, Credentials, ModelCatalog, RoleTable, resolve};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("MissingCredentials: an authorization-enabled call received no credentials")]
    MissingCredentials,

    #[error("Unauthorized model action \"{model}:{action}:{role}\"")]
    Forbidden {
        model: String,
        action: Action,
        role: String,
    },

    #[error("Unauthorized: credentials field \"{field}\" must be set to scope \"{model}\" records to their owner")]
    UnresolvedOwner { model: String, field: String },
}

/// How a model's records point at their owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    /// Field on this model holding the owner's identifier.
    pub foreign_key: String,
    /// Primary-key field of the owner model; the caller's id is read from it.
    pub owner_key: String,
    /// The model *is* the owner model: `foreign_key == owner_key` and records own themselves.
    pub self_owned: bool,
}

impl Ownership {
    pub fn new(foreign_key: impl Into<String>, owner_key: impl Into<String>) -> Self {
        Self {
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
            self_owned: false,
        }
    }

    /// Ownership of the owner model itself: a row is owned by the caller whose id it carries.
    pub fn of_owner_model(owner_key: impl Into<String>) -> Self {
        let owner_key = owner_key.into();
        Self {
            foreign_key: owner_key.clone(),
            owner_key,
            self_owned: true,
        }
    }

    /// Caller identifier used as the owner value.
    pub fn caller_id<'c>(
        &self,
        model: &str,
        credentials: Option<&'c Credentials>,
    ) -> Result<&'c Value, AuthzError> {
        credentials
            .and_then(|c| c.identity(&self.owner_key))
            .ok_or_else(|| AuthzError::UnresolvedOwner {
                model: model.to_string(),
                field: self.owner_key.clone(),
            })
    }
}

/// Everything needed to decide one (model, action, credentials) request.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub model: &'a str,
    pub action: Action,
    pub table: Option<&'a RoleTable>,
    pub ownership: Option<&'a Ownership>,
    pub credentials: Option<&'a Credentials>,
    /// Field of the credentials holding the caller's role.
    pub roles_property: &'a str,
}

/// Authorize a request and return the policy to apply.
///
/// - No IO
/// - No panics
/// - Owner restrictions on a model without an ownership binding fail closed
pub fn authorize(
    request: &AuthRequest<'_>,
    catalog: &dyn ModelCatalog,
) -> Result<AccessPolicy, AuthzError> {
    let credentials = request.credentials.ok_or(AuthzError::MissingCredentials)?;

    let forbidden = |role: &str| AuthzError::Forbidden {
        model: request.model.to_string(),
        action: request.action,
        role: role.to_string(),
    };

    let role = credentials
        .role(request.roles_property)
        .ok_or_else(|| forbidden("undefined"))?;

    let policy = resolve(request.table, &role, request.action, catalog);
    if !policy.allowed {
        return Err(forbidden(role.as_str()));
    }
    if policy.owner_restricted && request.ownership.is_none() {
        tracing::warn!(
            model = request.model,
            role = %role,
            "owner-restricted rule on a model without ownership; denying"
        );
        return Err(forbidden(role.as_str()));
    }

    tracing::debug!(
        model = request.model,
        action = %request.action,
        role = %role,
        owner = policy.owner_restricted,
        fields = ?policy.fields,
        "authorized"
    );
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmptyCatalog;
    use serde_json::json;

    fn table() -> RoleTable {
        RoleTable::from_value(&json!({ "admin": 1, "user": "owner" })).normalized()
    }

    fn request<'a>(
        table: &'a RoleTable,
        ownership: Option<&'a Ownership>,
        credentials: Option<&'a Credentials>,
    ) -> AuthRequest<'a> {
        AuthRequest {
            model: "Task",
            action: Action::Read,
            table: Some(table),
            ownership,
            credentials,
            roles_property: "roles",
        }
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let table = table();
        let err = authorize(&request(&table, None, None), &EmptyCatalog).unwrap_err();
        assert_eq!(err, AuthzError::MissingCredentials);
    }

    #[test]
    fn denied_role_names_model_action_and_role() {
        let table = table();
        let creds = Credentials::default().with("id", 9).with("roles", "guest");
        let err = authorize(&request(&table, None, Some(&creds)), &EmptyCatalog).unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized model action \"Task:read:guest\"");
    }

    #[test]
    fn credentials_without_role_are_unauthorized() {
        let table = table();
        let creds = Credentials::default().with("id", 9);
        let err = authorize(&request(&table, None, Some(&creds)), &EmptyCatalog).unwrap_err();
        assert!(matches!(err, AuthzError::Forbidden { .. }));
    }

    #[test]
    fn owner_rule_without_ownership_fails_closed() {
        let table = table();
        let creds = Credentials::default().with("id", 2).with("roles", "user");
        let err = authorize(&request(&table, None, Some(&creds)), &EmptyCatalog).unwrap_err();
        assert!(matches!(err, AuthzError::Forbidden { .. }));

        let ownership = Ownership::new("user_id", "id");
        let policy = authorize(&request(&table, Some(&ownership), Some(&creds)), &EmptyCatalog).unwrap();
        assert!(policy.owner_restricted);
    }

    #[test]
    fn caller_id_requires_identity() {
        let ownership = Ownership::new("user_id", "id");
        let anonymous = Credentials::default().with("roles", "user");
        let err = ownership.caller_id("Task", Some(&anonymous)).unwrap_err();
        assert_eq!(
            err,
            AuthzError::UnresolvedOwner {
                model: "Task".to_string(),
                field: "id".to_string()
            }
        );
    }
}
