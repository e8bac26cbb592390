//! Query augmentation: folding an [`AccessPolicy`] into caller queries and
//! create payloads.
//!
//! - No IO
//! - Inputs are never mutated; a new query is returned
//! - Policy clauses are conjunctive, so caller filters can only narrow them

use crudguard_auth::{AccessPolicy, Action, AuthRequest, AuthzError};
use crudguard_core::record::{is_nil, retain_fields};
use crudguard_core::{Clause, Condition, Query, Record};

use crate::error::CrudError;

/// Merge `policy` into a copy of `base` for `request.action`.
///
/// Owner-restricted non-create actions get `owner_fk = caller_id` appended;
/// field-restricted policies narrow the projection / write set.
pub fn augment(
    base: &Query,
    policy: &AccessPolicy,
    request: &AuthRequest<'_>,
) -> Result<Query, CrudError> {
    let mut query = base.clone();

    if policy.owner_restricted && request.action != Action::Create {
        let ownership = request.ownership.ok_or_else(|| forbidden(request))?;
        let caller = ownership.caller_id(request.model, request.credentials)?;
        query.and(Clause::new(
            ownership.foreign_key.clone(),
            Condition::Eq(caller.clone()),
        ));
    }

    if let Some(fields) = &policy.fields {
        query.narrow_fields(fields);
    }

    Ok(query)
}

/// Apply a create policy to one record: drop fields outside the policy, then
/// set the owner.
///
/// The owner is injected when the policy is owner-restricted (overwriting any
/// supplied value) or when the record has no owner. The owner model's own rows
/// are never rewritten.
pub fn restrict_create(
    mut record: Record,
    policy: &AccessPolicy,
    request: &AuthRequest<'_>,
) -> Result<Record, CrudError> {
    if let Some(fields) = &policy.fields {
        retain_fields(&mut record, fields);
    }

    let Some(ownership) = request.ownership else {
        return Ok(record);
    };
    if ownership.self_owned {
        return Ok(record);
    }

    if policy.owner_restricted || is_nil(&record, &ownership.foreign_key) {
        let caller = ownership.caller_id(request.model, request.credentials)?;
        record.insert(ownership.foreign_key.clone(), caller.clone());
    }

    Ok(record)
}

fn forbidden(request: &AuthRequest<'_>) -> CrudError {
    let role = request
        .credentials
        .and_then(|c| c.role(request.roles_property))
        .map(|r| r.to_string())
        .unwrap_or_else(|| "undefined".to_string());
    AuthzError::Forbidden {
        model: request.model.to_string(),
        action: request.action,
        role,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudguard_auth::{Credentials, Ownership};
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn request<'a>(
        action: Action,
        ownership: Option<&'a Ownership>,
        credentials: Option<&'a Credentials>,
    ) -> AuthRequest<'a> {
        AuthRequest {
            model: "Task",
            action,
            table: None,
            ownership,
            credentials,
            roles_property: "roles",
        }
    }

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn owner_clause_is_appended_after_caller_filter() {
        let ownership = Ownership::new("user_id", "id");
        let creds = Credentials::default().with("id", 7).with("roles", "user");
        let base = Query::new().where_eq("done", false);

        let query = augment(
            &base,
            &AccessPolicy::owner(),
            &request(Action::Read, Some(&ownership), Some(&creds)),
        )
        .unwrap();

        assert_eq!(query.filter.len(), 2);
        assert_eq!(query.filter[1], Clause::new("user_id", Condition::Eq(json!(7))));
        // input untouched
        assert_eq!(base.filter.len(), 1);
    }

    #[test]
    fn caller_filter_cannot_widen_owner_clause() {
        let ownership = Ownership::new("user_id", "id");
        let creds = Credentials::default().with("id", 7).with("roles", "user");
        let base = Query::new().where_eq("user_id", 8);

        let query = augment(
            &base,
            &AccessPolicy::owner(),
            &request(Action::Update, Some(&ownership), Some(&creds)),
        )
        .unwrap();

        assert!(!query.matches(&rec(json!({"user_id": 8}))));
        assert!(!query.matches(&rec(json!({"user_id": 7}))));
    }

    #[test]
    fn owner_restriction_without_identity_is_an_error() {
        let ownership = Ownership::new("user_id", "id");
        let creds = Credentials::default().with("roles", "user");
        let err = augment(
            &Query::new(),
            &AccessPolicy::owner(),
            &request(Action::Delete, Some(&ownership), Some(&creds)),
        )
        .unwrap_err();
        assert!(matches!(err, CrudError::UnresolvedOwner { .. }));
    }

    #[test]
    fn create_never_gets_an_owner_clause() {
        let ownership = Ownership::new("user_id", "id");
        let creds = Credentials::default().with("id", 7);
        let query = augment(
            &Query::new(),
            &AccessPolicy::owner(),
            &request(Action::Create, Some(&ownership), Some(&creds)),
        )
        .unwrap();
        assert!(query.filter.is_empty());
    }

    #[test]
    fn restrict_create_overwrites_owner_when_restricted() {
        let ownership = Ownership::new("user_id", "id");
        let creds = Credentials::default().with("id", 7);
        let req = request(Action::Create, Some(&ownership), Some(&creds));

        let forced = restrict_create(rec(json!({"title": "T", "user_id": 3})), &AccessPolicy::owner(), &req).unwrap();
        assert_eq!(forced["user_id"], json!(7));

        let kept = restrict_create(rec(json!({"title": "T", "user_id": 3})), &AccessPolicy::allow(), &req).unwrap();
        assert_eq!(kept["user_id"], json!(3));

        let filled = restrict_create(rec(json!({"title": "T"})), &AccessPolicy::allow(), &req).unwrap();
        assert_eq!(filled["user_id"], json!(7));
    }

    #[test]
    fn restrict_create_drops_fields_before_injecting_owner() {
        let ownership = Ownership::new("user_id", "id");
        let creds = Credentials::default().with("id", 7);
        let req = request(Action::Create, Some(&ownership), Some(&creds));
        let policy = AccessPolicy::scoped(true, Some(vec!["title".to_string()]));

        let record = restrict_create(rec(json!({"title": "T", "secret": 1})), &policy, &req).unwrap();
        assert_eq!(Value::Object(record), json!({"title": "T", "user_id": 7}));
    }

    #[test]
    fn owner_model_rows_are_not_rewritten() {
        let ownership = Ownership::of_owner_model("id");
        let creds = Credentials::default().with("id", 7);
        let req = request(Action::Create, Some(&ownership), Some(&creds));
        let record = restrict_create(rec(json!({"name": "bob"})), &AccessPolicy::owner(), &req).unwrap();
        assert!(!record.contains_key("id"));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        /// Property: a field-restricted policy never widens the caller's projection.
        #[test]
        fn projection_only_narrows(
            requested in prop::option::of(prop::collection::vec("[a-e]", 0..5)),
            allowed in prop::collection::vec("[a-e]", 0..5),
        ) {
            let mut base = Query::new();
            base.fields = requested.clone();
            let policy = AccessPolicy::scoped(false, Some(allowed.clone()));
            let query = augment(&base, &policy, &request(Action::Read, None, None)).unwrap();

            let fields = query.fields.unwrap();
            for f in &fields {
                prop_assert!(allowed.contains(f));
                if let Some(requested) = &requested {
                    prop_assert!(requested.contains(f));
                }
            }
        }
    }
}
