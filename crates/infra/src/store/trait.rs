use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crudguard_core::{Query, Record, RecordKey};

/// How a model's primary key gets its value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyGeneration {
    /// Supplied by the caller.
    Manual,
    /// Storage-assigned integer sequence.
    AutoIncrement,
    /// Storage-assigned UUIDv7 string.
    Uuid,
}

/// Primary-key declaration of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub field: String,
    pub generation: KeyGeneration,
}

impl PrimaryKey {
    pub fn auto_increment(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            generation: KeyGeneration::AutoIncrement,
        }
    }

    pub fn uuid(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            generation: KeyGeneration::Uuid,
        }
    }

    pub fn manual(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            generation: KeyGeneration::Manual,
        }
    }

    /// Storage-assigned identity must not be client-supplied.
    pub fn is_generated(&self) -> bool {
        !matches!(self.generation, KeyGeneration::Manual)
    }

    /// Filter value addressing `key` on this model.
    ///
    /// Integer sequences also accept their decimal text, since keys taken from
    /// JSON objects are always strings. Other keys match exactly as supplied.
    pub fn key_value(&self, key: &RecordKey) -> Value {
        match (self.generation, key) {
            (KeyGeneration::AutoIncrement, RecordKey::Str(raw)) => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| key.to_value()),
            _ => key.to_value(),
        }
    }
}

/// Storage adapter error.
///
/// These are **infrastructure errors**; the orchestrator propagates them
/// unchanged (or records them at the failing record's position).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown scope '{scope}' on model '{model}'")]
    UnknownScope { model: String, scope: String },

    #[error("constraint violation on '{model}.{field}': {reason}")]
    Constraint {
        model: String,
        field: String,
        reason: String,
    },

    #[error("storage is closed")]
    Closed,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn constraint(model: &str, field: &str, reason: impl Into<String>) -> Self {
        Self::Constraint {
            model: model.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Per-model storage boundary.
///
/// Implementations own query execution, constraints and scopes. Every method
/// is a suspension point for the caller.
#[async_trait::async_trait]
pub trait ModelStore: Send + Sync {
    fn name(&self) -> &str;

    fn primary_key(&self) -> &PrimaryKey;

    /// First record matching `query`, after scopes, filter and projection.
    async fn find_one(&self, query: &Query) -> Result<Option<Record>, StoreError>;

    async fn find_all(&self, query: &Query) -> Result<Vec<Record>, StoreError>;

    async fn create(&self, record: Record) -> Result<Record, StoreError>;

    /// Insert every record or none of them.
    async fn bulk_create(&self, records: Vec<Record>) -> Result<Vec<Record>, StoreError>;

    /// Apply `patch` to matching records; `query.fields`, when set, limits the
    /// written fields. Returns the number of modified records.
    async fn update(&self, patch: Record, query: &Query) -> Result<u64, StoreError>;

    /// Delete matching records and return how many were removed.
    async fn destroy(&self, query: &Query) -> Result<u64, StoreError>;
}

/// Whole storage backend: per-model handles plus lifecycle.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    fn model(&self, key: &str) -> Option<Arc<dyn ModelStore>>;

    /// Release connections. Further calls on any model handle fail.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S> Storage for Arc<S>
where
    S: Storage + ?Sized,
{
    fn model(&self, key: &str) -> Option<Arc<dyn ModelStore>> {
        (**self).model(key)
    }

    async fn close(&self) -> Result<(), StoreError> {
        (**self).close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequence_keys_accept_decimal_text() {
        let pk = PrimaryKey::auto_increment("id");
        assert_eq!(pk.key_value(&RecordKey::from("7")), json!(7));
        assert_eq!(pk.key_value(&RecordKey::Int(7)), json!(7));
        assert_eq!(pk.key_value(&RecordKey::from("x7")), json!("x7"));
    }

    #[test]
    fn manual_and_uuid_keys_match_as_supplied() {
        assert_eq!(PrimaryKey::manual("code").key_value(&RecordKey::from("007")), json!("007"));
        assert_eq!(PrimaryKey::uuid("uid").key_value(&RecordKey::from("123")), json!("123"));
        assert_eq!(PrimaryKey::manual("code").key_value(&RecordKey::Int(5)), json!(5));
    }
}
