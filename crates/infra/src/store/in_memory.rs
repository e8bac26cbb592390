use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crudguard_core::record::{is_nil, project, retain_fields};
use crudguard_core::{Clause, Condition, Query, Record};

use super::r#trait::{KeyGeneration, ModelStore, PrimaryKey, Storage, StoreError};

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Named query transformation: extra filter clauses and/or a projection.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub filter: Vec<Clause>,
    pub fields: Option<Vec<String>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_null(mut self, field: impl Into<String>) -> Self {
        self.filter.push(Clause::new(field, Condition::IsNull));
        self
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.push(Clause::new(field, Condition::Eq(value.into())));
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Table definition for the in-memory adapter.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    pub name: String,
    pub primary_key: PrimaryKey,
    /// Fields that must be present and non-null.
    pub required: Vec<String>,
    /// Fields whose non-null values must be unique (the primary key always is).
    pub unique: Vec<String>,
    pub scopes: HashMap<String, Scope>,
    /// Maintain `created_at` / `updated_at`.
    pub timestamps: bool,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>, primary_key: PrimaryKey) -> Self {
        Self {
            name: name.into(),
            primary_key,
            required: Vec::new(),
            unique: Vec::new(),
            scopes: HashMap::new(),
            timestamps: true,
        }
    }

    pub fn required<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn unique<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn scope(mut self, name: impl Into<String>, scope: Scope) -> Self {
        self.scopes.insert(name.into(), scope);
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}

#[derive(Debug)]
struct Table {
    rows: Vec<Record>,
    next_id: i64,
}

/// Scopes folded into the caller's query.
struct Effective<'q> {
    clauses: Vec<&'q Clause>,
    fields: Option<Vec<String>>,
}

impl Effective<'_> {
    fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}

/// In-memory model store.
///
/// Intended for tests/dev. Rows are kept in insertion order so reads are
/// deterministic.
#[derive(Debug)]
pub struct InMemoryModel {
    schema: ModelSchema,
    table: RwLock<Table>,
    closed: Arc<AtomicBool>,
}

impl InMemoryModel {
    fn new(schema: ModelSchema, closed: Arc<AtomicBool>) -> Self {
        Self {
            schema,
            table: RwLock::new(Table {
                rows: Vec::new(),
                next_id: 1,
            }),
            closed,
        }
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }

    fn effective<'q>(&'q self, query: &'q Query) -> Result<Effective<'q>, StoreError> {
        let mut clauses: Vec<&Clause> = Vec::new();
        let mut fields: Option<Vec<String>> = None;

        for name in &query.scopes {
            let scope = self
                .schema
                .scopes
                .get(name)
                .ok_or_else(|| StoreError::UnknownScope {
                    model: self.schema.name.clone(),
                    scope: name.clone(),
                })?;
            clauses.extend(scope.filter.iter());
            if let Some(scope_fields) = &scope.fields {
                fields = Some(intersect(fields, scope_fields));
            }
        }

        clauses.extend(query.filter.iter());
        if let Some(query_fields) = &query.fields {
            fields = Some(intersect(fields, query_fields));
        }

        Ok(Effective { clauses, fields })
    }

    /// Indices of rows matching `effective`, honouring offset and limit.
    fn matching(table: &Table, effective: &Effective<'_>, query: &Query) -> Vec<usize> {
        table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| effective.matches(row))
            .map(|(idx, _)| idx)
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Assign identity/timestamps and check constraints for a row about to be inserted.
    ///
    /// `pending` holds rows accepted earlier in the same batch.
    fn prepare_insert(
        &self,
        mut record: Record,
        table: &Table,
        next_id: &mut i64,
        pending: &[Record],
    ) -> Result<Record, StoreError> {
        let pk = &self.schema.primary_key;
        let model = self.schema.name.as_str();

        match pk.generation {
            KeyGeneration::AutoIncrement => {
                let exhausted = || StoreError::constraint(model, &pk.field, "key space exhausted");
                match record.get(&pk.field).and_then(Value::as_i64) {
                    Some(explicit) => {
                        let after = explicit.checked_add(1).ok_or_else(exhausted)?;
                        *next_id = (*next_id).max(after);
                    }
                    None => {
                        let id = *next_id;
                        *next_id = id.checked_add(1).ok_or_else(exhausted)?;
                        record.insert(pk.field.clone(), Value::from(id));
                    }
                }
            }
            KeyGeneration::Uuid => {
                if is_nil(&record, &pk.field) {
                    record.insert(pk.field.clone(), Value::String(Uuid::now_v7().to_string()));
                }
            }
            KeyGeneration::Manual => {
                if is_nil(&record, &pk.field) {
                    return Err(StoreError::constraint(model, &pk.field, "primary key is required"));
                }
            }
        }

        for field in &self.schema.required {
            if is_nil(&record, field) {
                return Err(StoreError::constraint(model, field, "cannot be null"));
            }
        }

        for field in self.unique_fields() {
            let Some(value) = record.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = table
                .rows
                .iter()
                .chain(pending.iter())
                .any(|row| row.get(field) == Some(value));
            if taken {
                return Err(StoreError::constraint(model, field, "must be unique"));
            }
        }

        if self.schema.timestamps {
            let now = Value::String(Utc::now().to_rfc3339());
            record.insert(CREATED_AT.to_string(), now.clone());
            record.insert(UPDATED_AT.to_string(), now);
        }

        Ok(record)
    }

    fn unique_fields(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.schema.primary_key.field).chain(self.schema.unique.iter())
    }
}

#[async_trait::async_trait]
impl ModelStore for InMemoryModel {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn primary_key(&self) -> &PrimaryKey {
        &self.schema.primary_key
    }

    async fn find_one(&self, query: &Query) -> Result<Option<Record>, StoreError> {
        let mut first = query.clone();
        first.limit = Some(1);
        Ok(self.find_all(&first).await?.into_iter().next())
    }

    async fn find_all(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        self.ensure_open()?;
        let effective = self.effective(query)?;
        let table = self.table.read().map_err(|_| Self::poisoned())?;

        Ok(Self::matching(&table, &effective, query)
            .into_iter()
            .map(|idx| match &effective.fields {
                Some(fields) => project(&table.rows[idx], fields),
                None => table.rows[idx].clone(),
            })
            .collect())
    }

    async fn create(&self, record: Record) -> Result<Record, StoreError> {
        self.ensure_open()?;
        let mut table = self.table.write().map_err(|_| Self::poisoned())?;

        let mut next_id = table.next_id;
        let row = self.prepare_insert(record, &table, &mut next_id, &[])?;
        table.next_id = next_id;
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn bulk_create(&self, records: Vec<Record>) -> Result<Vec<Record>, StoreError> {
        self.ensure_open()?;
        let mut table = self.table.write().map_err(|_| Self::poisoned())?;

        // Validate the whole batch before touching the table.
        let mut next_id = table.next_id;
        let mut accepted: Vec<Record> = Vec::with_capacity(records.len());
        for record in records {
            let row = self.prepare_insert(record, &table, &mut next_id, &accepted)?;
            accepted.push(row);
        }

        table.next_id = next_id;
        table.rows.extend(accepted.iter().cloned());
        Ok(accepted)
    }

    async fn update(&self, mut patch: Record, query: &Query) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let effective = self.effective(query)?;
        if let Some(fields) = &query.fields {
            retain_fields(&mut patch, fields);
        }
        if patch.is_empty() {
            return Ok(0);
        }

        let model = self.schema.name.as_str();
        for field in &self.schema.required {
            if patch.get(field).is_some_and(Value::is_null) {
                return Err(StoreError::constraint(model, field, "cannot be null"));
            }
        }

        let mut table = self.table.write().map_err(|_| Self::poisoned())?;
        let targets = Self::matching(&table, &effective, query);

        for field in self.unique_fields() {
            let Some(value) = patch.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = table
                .rows
                .iter()
                .enumerate()
                .any(|(idx, row)| row.get(field) == Some(value) && !targets.contains(&idx));
            if clash || targets.len() > 1 {
                return Err(StoreError::constraint(model, field, "must be unique"));
            }
        }

        let now = Value::String(Utc::now().to_rfc3339());
        for &idx in &targets {
            let row = &mut table.rows[idx];
            for (k, v) in &patch {
                row.insert(k.clone(), v.clone());
            }
            if self.schema.timestamps {
                row.insert(UPDATED_AT.to_string(), now.clone());
            }
        }

        Ok(targets.len() as u64)
    }

    async fn destroy(&self, query: &Query) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let effective = self.effective(query)?;
        let mut table = self.table.write().map_err(|_| Self::poisoned())?;

        let targets = Self::matching(&table, &effective, query);
        let mut idx = 0usize;
        table.rows.retain(|_| {
            let keep = !targets.contains(&idx);
            idx += 1;
            keep
        });

        Ok(targets.len() as u64)
    }
}

/// In-memory storage backend holding one [`InMemoryModel`] per defined schema.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    models: RwLock<HashMap<String, Arc<InMemoryModel>>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Define (or redefine, dropping its rows) a model table.
    pub fn define(&self, schema: ModelSchema) -> Result<Arc<InMemoryModel>, StoreError> {
        let model = Arc::new(InMemoryModel::new(schema, Arc::clone(&self.closed)));
        let mut models = self.models.write().map_err(|_| InMemoryModel::poisoned())?;
        models.insert(model.schema.name.clone(), Arc::clone(&model));
        Ok(model)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait::async_trait]
impl Storage for InMemoryStorage {
    fn model(&self, key: &str) -> Option<Arc<dyn ModelStore>> {
        let models = self.models.read().ok()?;
        models
            .get(key)
            .map(|m| Arc::clone(m) as Arc<dyn ModelStore>)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

fn intersect(current: Option<Vec<String>>, with: &[String]) -> Vec<String> {
    match current {
        Some(fields) => fields.into_iter().filter(|f| with.contains(f)).collect(),
        None => with.to_vec(),
    }
}
