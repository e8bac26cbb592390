use serde::{Deserialize, Serialize};
use serde_json::Value;

use crudguard_core::{DomainError, DomainResult, Record};

use crate::Role;

/// Caller identity as supplied by the application.
///
/// Opaque to this layer except for two fields: the role value (at the
/// configured roles property) and the identifier (at the owner model's
/// primary-key field).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(Record);

impl Credentials {
    pub fn new(fields: Record) -> Self {
        Self(fields)
    }

    pub fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(DomainError::validation("credentials must be an object")),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn role(&self, roles_property: &str) -> Option<Role> {
        self.get(roles_property).and_then(Role::from_value)
    }

    /// Caller identifier stored under `key_field`; `null` counts as absent.
    pub fn identity(&self, key_field: &str) -> Option<&Value> {
        self.get(key_field).filter(|v| !v.is_null())
    }
}
