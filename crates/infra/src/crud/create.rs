use serde_json::Value;

use crudguard_auth::Action;
use crudguard_core::Record;
use crudguard_core::record::record_from_value;

use super::{Crud, CrudOptions, Guard};
use crate::augment::restrict_create;
use crate::error::CrudError;

/// Create payload; the result shape mirrors it.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateInput {
    Single(Record),
    Batch(Vec<Record>),
}

impl From<Record> for CreateInput {
    fn from(value: Record) -> Self {
        CreateInput::Single(value)
    }
}

impl From<Vec<Record>> for CreateInput {
    fn from(value: Vec<Record>) -> Self {
        CreateInput::Batch(value)
    }
}

impl TryFrom<Value> for CreateInput {
    type Error = CrudError;

    /// An object is a single record, an array a batch; `null` is rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Err(CrudError::undefined_properties(
                "records must be an object or an array of objects",
            )),
            Value::Array(items) => Ok(CreateInput::Batch(
                items
                    .into_iter()
                    .map(record_from_value)
                    .collect::<Result<_, _>>()?,
            )),
            other => Ok(CreateInput::Single(record_from_value(other)?)),
        }
    }
}

#[derive(Debug)]
pub enum CreateOutput {
    One(Record),
    /// Positionally aligned with the input batch.
    Many(Vec<Result<Record, CrudError>>),
}

impl CreateOutput {
    pub fn one(self) -> Option<Record> {
        match self {
            CreateOutput::One(record) => Some(record),
            CreateOutput::Many(_) => None,
        }
    }

    pub fn many(self) -> Option<Vec<Result<Record, CrudError>>> {
        match self {
            CreateOutput::Many(results) => Some(results),
            CreateOutput::One(_) => None,
        }
    }
}

impl Crud {
    /// Insert one record or a batch.
    ///
    /// Batches insert record by record and report failures at their position,
    /// unless `options.bulk` asks for a single all-or-nothing insert. A single
    /// record's failure is returned as the call's error.
    #[tracing::instrument(name = "crud.create", skip_all, fields(model = %model))]
    pub async fn create(
        &self,
        model: &str,
        input: CreateInput,
        options: &CrudOptions,
    ) -> Result<CreateOutput, CrudError> {
        match input {
            CreateInput::Single(record) => Ok(CreateOutput::One(self.create_one(model, record, options).await?)),
            CreateInput::Batch(records) => self.create_batch(model, records, options).await,
        }
    }

    pub(super) async fn create_one(
        &self,
        model: &str,
        record: Record,
        options: &CrudOptions,
    ) -> Result<Record, CrudError> {
        let guard = self.guard(model, Action::Create, options)?;
        let record = self.prepare_create(&guard, options, record)?;
        let created = guard.descriptor.store.create(record).await?;
        tracing::debug!(model, "record created");
        Ok(created)
    }

    async fn create_batch(
        &self,
        model: &str,
        records: Vec<Record>,
        options: &CrudOptions,
    ) -> Result<CreateOutput, CrudError> {
        let guard = self.guard(model, Action::Create, options)?;
        let store = &guard.descriptor.store;

        let records = records
            .into_iter()
            .map(|record| self.prepare_create(&guard, options, record))
            .collect::<Result<Vec<_>, _>>()?;

        if options.bulk {
            let created = store.bulk_create(records).await?;
            tracing::debug!(model, created = created.len(), "bulk create finished");
            return Ok(CreateOutput::Many(created.into_iter().map(Ok).collect()));
        }

        let mut results = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match store.create(record).await {
                Ok(created) => results.push(Ok(created)),
                Err(err) => {
                    tracing::warn!(model, index, error = %err, "record create failed");
                    results.push(Err(err.into()));
                }
            }
        }

        tracing::debug!(
            model,
            created = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "batch create finished"
        );
        Ok(CreateOutput::Many(results))
    }

    /// Strip generated identity, then apply the create policy.
    fn prepare_create(
        &self,
        guard: &Guard<'_>,
        options: &CrudOptions,
        mut record: Record,
    ) -> Result<Record, CrudError> {
        let pk = guard.descriptor.store.primary_key();
        if pk.is_generated() {
            record.remove(&pk.field);
        }

        match &guard.policy {
            None => Ok(record),
            Some(policy) => restrict_create(
                record,
                policy,
                &self.request(guard.descriptor, guard.action, options),
            ),
        }
    }
}
