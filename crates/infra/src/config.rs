//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::error::CrudError;

pub const ENV_AUTH_ENABLED: &str = "CRUDGUARD_AUTH_ENABLED";
pub const ENV_MODEL_OWNER: &str = "CRUDGUARD_MODEL_OWNER";
pub const ENV_OWNER_FOREIGN_KEY: &str = "CRUDGUARD_OWNER_FOREIGN_KEY";
pub const ENV_ROLES_PROPERTY: &str = "CRUDGUARD_ROLES_PROPERTY";

/// Global settings shared by every model in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudConfig {
    /// Key of the model whose records are owners. `None` disables ownership,
    /// which makes every owner-restricted rule deny.
    pub model_owner: Option<String>,
    /// Default field on owned models pointing at the owner's primary key.
    pub owner_foreign_key: String,
    /// Credentials field holding the caller's role.
    pub roles_property: String,
    /// When false, every operation bypasses role resolution and query augmentation.
    pub auth_enabled: bool,
}

impl Default for CrudConfig {
    fn default() -> Self {
        Self {
            model_owner: Some("User".to_string()),
            owner_foreign_key: "user_id".to_string(),
            roles_property: "roles".to_string(),
            auth_enabled: true,
        }
    }
}

impl CrudConfig {
    /// Defaults overridden by `CRUDGUARD_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CrudConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_AUTH_ENABLED) {
            match parse_flag(&raw) {
                Some(enabled) => config.auth_enabled = enabled,
                None => tracing::warn!(
                    var = ENV_AUTH_ENABLED,
                    value = %raw,
                    "unparsable boolean; keeping default"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_MODEL_OWNER) {
            let raw = raw.trim();
            config.model_owner = match raw {
                "" | "none" => None,
                owner => Some(owner.to_string()),
            };
        }

        if let Some(raw) = lookup(ENV_OWNER_FOREIGN_KEY).filter(|v| !v.trim().is_empty()) {
            config.owner_foreign_key = raw.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_ROLES_PROPERTY).filter(|v| !v.trim().is_empty()) {
            config.roles_property = raw.trim().to_string();
        }

        config
    }

    pub fn without_auth(mut self) -> Self {
        self.auth_enabled = false;
        self
    }

    pub fn with_model_owner(mut self, owner: Option<&str>) -> Self {
        self.model_owner = owner.map(str::to_string);
        self
    }

    pub fn validate(&self) -> Result<(), CrudError> {
        if self.roles_property.is_empty() {
            return Err(CrudError::config("roles_property must not be empty"));
        }
        if self.owner_foreign_key.is_empty() {
            return Err(CrudError::config("owner_foreign_key must not be empty"));
        }
        if self.model_owner.as_deref().is_some_and(str::is_empty) {
            return Err(CrudError::config("model_owner must be the key of the model for owners"));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
