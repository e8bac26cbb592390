//! Storage-agnostic query description.
//!
//! A [`Query`] is the only shape the authorization layer needs to understand:
//! a conjunction of field clauses, an optional field projection (which doubles
//! as the write set for updates), named scopes and pagination. Everything else
//! about execution belongs to the storage adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;

/// Predicate on a single field value. A missing field is treated as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Condition {
    Eq(Value),
    /// In-set operator.
    In(Vec<Value>),
    IsNull,
    NotNull,
}

impl Condition {
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = value.unwrap_or(&Value::Null);
        match self {
            Condition::Eq(Value::Null) | Condition::IsNull => value.is_null(),
            Condition::Eq(expected) => value == expected,
            Condition::In(set) => set.iter().any(|v| v == value),
            Condition::NotNull => !value.is_null(),
        }
    }
}

/// `field <condition>`; clauses of a query are AND-ed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub field: String,
    pub condition: Condition,
}

impl Clause {
    pub fn new(field: impl Into<String>, condition: Condition) -> Self {
        Self {
            field: field.into(),
            condition,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.condition.matches(record.get(&self.field))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filter: Vec<Clause>,
    /// Projection for reads, write set for updates. `None` means "all fields".
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    /// Named, adapter-defined scopes applied in order.
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.push(Clause::new(field, Condition::Eq(value.into())));
        self
    }

    pub fn where_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let set = values.into_iter().map(Into::into).collect();
        self.filter.push(Clause::new(field, Condition::In(set)));
        self
    }

    pub fn where_null(mut self, field: impl Into<String>) -> Self {
        self.filter.push(Clause::new(field, Condition::IsNull));
        self
    }

    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scopes.push(name.into());
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

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Append a clause. Clauses only ever narrow the matched set.
    pub fn and(&mut self, clause: Clause) {
        self.filter.push(clause);
    }

    /// Intersect the projection with `allowed`.
    pub fn narrow_fields(&mut self, allowed: &[String]) {
        let narrowed = match self.fields.take() {
            Some(requested) => requested
                .into_iter()
                .filter(|f| allowed.contains(f))
                .collect(),
            None => allowed.to_vec(),
        };
        self.fields = Some(narrowed);
    }

    /// True when every clause matches.
    pub fn matches(&self, record: &Record) -> bool {
        self.filter.iter().all(|c| c.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_fields_match_null_conditions() {
        let r = rec(json!({"title": "a"}));
        assert!(Condition::IsNull.matches(r.get("parent")));
        assert!(Condition::Eq(Value::Null).matches(r.get("parent")));
        assert!(!Condition::NotNull.matches(r.get("parent")));
    }

    #[test]
    fn clauses_are_conjunctive() {
        let q = Query::new().where_eq("user_id", 2).where_in("id", [1, 3]);
        assert!(q.matches(&rec(json!({"id": 3, "user_id": 2}))));
        assert!(!q.matches(&rec(json!({"id": 2, "user_id": 2}))));
        assert!(!q.matches(&rec(json!({"id": 3, "user_id": 1}))));
    }

    #[test]
    fn narrowing_intersects_requested_fields() {
        let mut q = Query::new().fields(["id", "title", "content"]);
        q.narrow_fields(&["title".to_string(), "owner".to_string()]);
        assert_eq!(q.fields, Some(vec!["title".to_string()]));

        let mut open = Query::new();
        open.narrow_fields(&["title".to_string()]);
        assert_eq!(open.fields, Some(vec!["title".to_string()]));
    }

    #[test]
    fn query_deserializes_from_json() {
        let q: Query = serde_json::from_value(json!({
            "filter": [{"field": "parent", "condition": {"op": "is_null"}}],
            "scopes": ["collection"],
            "limit": 10
        }))
        .unwrap();
        assert_eq!(q.scopes, vec!["collection".to_string()]);
        assert_eq!(q.limit, Some(10));
        assert!(q.matches(&rec(json!({"title": "root"}))));
    }
}
