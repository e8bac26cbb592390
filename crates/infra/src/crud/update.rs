use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crudguard_auth::Action;
use crudguard_core::record::retain_fields;
use crudguard_core::{Clause, Condition, Query, Record, RecordKey};

use super::{Crud, CrudOptions};
use crate::error::CrudError;
use crate::registry::ModelDescriptor;

/// Partial records keyed by primary key. A `None` entry is a caller mistake
/// that fails only its own key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBatch(BTreeMap<RecordKey, Option<Record>>);

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<RecordKey>, patch: Record) -> Self {
        self.0.insert(key.into(), Some(patch));
        self
    }

    pub fn with_null(mut self, key: impl Into<RecordKey>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    /// `{"<key>": {..patch..}, ...}`. Keys keep the caller's spelling; the
    /// model's primary-key declaration decides how they match.
    pub fn from_value(value: Value) -> Result<Self, CrudError> {
        match value {
            Value::Object(map) => Ok(Self(
                map.into_iter()
                    .map(|(key, patch)| {
                        let patch = match patch {
                            Value::Object(record) => Some(record),
                            _ => None,
                        };
                        (RecordKey::Str(key), patch)
                    })
                    .collect(),
            )),
            Value::Null => Err(CrudError::undefined_properties("update records must be defined")),
            _ => Err(CrudError::undefined_properties(
                "update records must be an object keyed by primary key",
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(RecordKey, Record)> for UpdateBatch {
    fn from_iter<T: IntoIterator<Item = (RecordKey, Record)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k, Some(v))).collect())
    }
}

/// Per-key update result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateOutcome {
    /// Rows actually modified: 0 when the row is missing *or* not the caller's.
    pub result: u64,
    /// Side-channel data attached by an after-update hook.
    #[serde(flatten)]
    pub extra: Record,
}

pub type UpdateResults = BTreeMap<RecordKey, Result<UpdateOutcome, CrudError>>;

impl Crud {
    /// Update each key independently; failures are reported at their key.
    #[tracing::instrument(name = "crud.update", skip_all, fields(model = %model, keys = batch.len()))]
    pub async fn update(
        &self,
        model: &str,
        batch: UpdateBatch,
        options: &CrudOptions,
    ) -> Result<UpdateResults, CrudError> {
        let guard = self.guard(model, Action::Update, options)?;
        // Policy clauses are the same for every key.
        let template = self.scoped(&guard, options, &options.query)?;

        let mut results = BTreeMap::new();
        for (key, patch) in batch.0 {
            let outcome = match patch {
                None => Err(CrudError::undefined_properties(
                    "record cannot be null or undefined",
                )),
                Some(patch) => update_one(guard.descriptor, &template, &key, patch).await,
            };
            if let Err(err) = &outcome {
                tracing::warn!(model, key = %key, error = %err, "record update failed");
            }
            results.insert(key, outcome);
        }

        Ok(results)
    }
}

async fn update_one(
    descriptor: &ModelDescriptor,
    template: &Query,
    key: &RecordKey,
    patch: Record,
) -> Result<UpdateOutcome, CrudError> {
    let pk = descriptor.store.primary_key();
    let mut query = template.clone();
    query.and(Clause::new(pk.field.clone(), Condition::Eq(pk.key_value(key))));
    query.limit = Some(1);

    let mut patch = descriptor
        .hooks
        .before_update(patch, key, &query)
        .await
        .map_err(CrudError::Hook)?;
    // The after-update hook sees only what was written.
    if let Some(fields) = &query.fields {
        retain_fields(&mut patch, fields);
    }

    let modified = descriptor.store.update(patch.clone(), &query).await?;
    let mut outcome = UpdateOutcome {
        result: modified,
        extra: Record::new(),
    };

    descriptor
        .hooks
        .after_update(&patch, key, &query, &mut outcome)
        .await
        .map_err(CrudError::Hook)?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_from_value_keeps_supplied_keys_and_nulls() {
        let batch = UpdateBatch::from_value(json!({
            "1": {"title": "a"},
            "007": {"title": "b"},
            "abc": null,
        }))
        .unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.0.contains_key(&RecordKey::from("007")));
        assert!(!batch.0.contains_key(&RecordKey::Int(7)));
        assert_eq!(
            batch.0[&RecordKey::from("1")],
            Some(json!({"title": "a"}).as_object().cloned().unwrap())
        );
        assert_eq!(batch.0[&RecordKey::Str("abc".into())], None);
    }

    #[test]
    fn null_batch_is_undefined_properties() {
        assert!(matches!(
            UpdateBatch::from_value(Value::Null),
            Err(CrudError::UndefinedProperties(_))
        ));
    }

    #[test]
    fn outcome_serializes_side_data_next_to_result() {
        let mut outcome = UpdateOutcome {
            result: 1,
            extra: Record::new(),
        };
        outcome.extra.insert("my_prop".into(), json!("x"));
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json!({"result": 1, "my_prop": "x"}));
    }
}
