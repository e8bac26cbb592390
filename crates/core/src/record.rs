//! Records: plain field-name → value maps, plus the few helpers every layer needs.

use serde_json::{Map, Value};

use crate::error::{DomainError, DomainResult};

/// A record as exchanged with storage adapters and callers.
pub type Record = Map<String, Value>;

/// Creation/update timestamp fields in both camelCase and snake_case flavours.
pub const TIMESTAMP_FIELDS: [&str; 4] = ["createdAt", "created_at", "updatedAt", "updated_at"];

/// Interpret a JSON value as a record. Anything but an object is rejected.
pub fn record_from_value(value: Value) -> DomainResult<Record> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(DomainError::validation("record cannot be null")),
        other => Err(DomainError::validation(format!(
            "record must be an object, got {}",
            value_kind(&other)
        ))),
    }
}

/// True when the field is absent or explicitly `null`.
pub fn is_nil(record: &Record, field: &str) -> bool {
    matches!(record.get(field), None | Some(Value::Null))
}

/// Copy of `record` limited to `fields` (missing fields are skipped, not nulled).
pub fn project(record: &Record, fields: &[String]) -> Record {
    record
        .iter()
        .filter(|(k, _)| fields.iter().any(|f| f == *k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// In-place variant of [`project`].
pub fn retain_fields(record: &mut Record, fields: &[String]) {
    record.retain(|k, _| fields.iter().any(|f| f == k));
}

/// Deep-merge `overrides` into `target`.
///
/// Nested objects merge key by key; arrays and scalars replace the target value.
pub fn merge(target: &mut Record, overrides: &Record) {
    for (key, value) in overrides {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
