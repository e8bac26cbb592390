use std::collections::BTreeMap;

use serde_json::Value;

use crudguard_auth::Action;
use crudguard_core::{Clause, Condition, Record, RecordKey};

use super::{Crud, CrudOptions};
use crate::error::CrudError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    /// Primary-key lookup.
    One(RecordKey),
    /// Every record matching the (augmented) query.
    All,
    /// Collection re-keyed by the given field; last write wins on collisions.
    IndexedBy(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutput {
    One(Option<Record>),
    Many(Vec<Record>),
    Indexed(BTreeMap<String, Record>),
}

impl ReadOutput {
    pub fn one(self) -> Option<Record> {
        match self {
            ReadOutput::One(record) => record,
            _ => None,
        }
    }

    pub fn many(self) -> Vec<Record> {
        match self {
            ReadOutput::Many(records) => records,
            ReadOutput::Indexed(map) => map.into_values().collect(),
            ReadOutput::One(record) => record.into_iter().collect(),
        }
    }
}

impl Crud {
    #[tracing::instrument(name = "crud.read", skip_all, fields(model = %model))]
    pub async fn read(
        &self,
        model: &str,
        target: ReadTarget,
        options: &CrudOptions,
    ) -> Result<ReadOutput, CrudError> {
        let guard = self.guard(model, Action::Read, options)?;
        let store = &guard.descriptor.store;

        match target {
            ReadTarget::One(key) => {
                let mut base = options.query.clone();
                base.and(Clause::new(
                    store.primary_key().field.clone(),
                    Condition::Eq(store.primary_key().key_value(&key)),
                ));
                let query = self.scoped(&guard, options, &base)?;
                Ok(ReadOutput::One(store.find_one(&query).await?))
            }
            ReadTarget::All => {
                let query = self.scoped(&guard, options, &options.query)?;
                Ok(ReadOutput::Many(store.find_all(&query).await?))
            }
            ReadTarget::IndexedBy(field) => {
                let query = self.scoped(&guard, options, &options.query)?;
                let records = store.find_all(&query).await?;
                Ok(ReadOutput::Indexed(index_by(records, &field)))
            }
        }
    }
}

/// Re-key records by `field`. Records without the field are left out.
fn index_by(records: Vec<Record>, field: &str) -> BTreeMap<String, Record> {
    let mut indexed = BTreeMap::new();
    for record in records {
        let key = match record.get(field) {
            None | Some(Value::Null) => {
                tracing::debug!(field, "record lacks index field; skipped");
                continue;
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        indexed.insert(key, record);
    }
    indexed
}
