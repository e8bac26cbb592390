//! Role tables and the rule union they are made of.
//!
//! A model declares a [`RoleTable`]: per role, a [`RoleRule`] that is either a
//! single [`RuleLeaf`] applied to every action or a per-action table of leaves.
//! Tables can be built in code or read from the loose JSON shape
//! (`{ "admin": 1, "user": "owner", "guest": { "read": true } }`).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::{Action, ModelCatalog, Role};

/// Shorthand string meaning "owner-restricted for every action".
pub const OWNER_SHORTHAND: &str = "owner";

type ResolverFn = dyn Fn(&Role, &dyn ModelCatalog) -> RoleRule + Send + Sync;

/// Rule computed at call time from the caller's role and the model catalog.
#[derive(Clone)]
pub struct Resolver(Arc<ResolverFn>);

impl Resolver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Role, &dyn ModelCatalog) -> RoleRule + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, role: &Role, catalog: &dyn ModelCatalog) -> RoleRule {
        (self.0)(role, catalog)
    }
}

impl core::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Resolver(..)")
    }
}

/// Decision for one action (or, at role level, for all of them).
#[derive(Debug, Clone)]
pub enum RuleLeaf {
    Allow,
    Deny,
    /// Shorthand for `Scoped { owner: true, fields: None }`.
    OwnerOnly,
    Scoped {
        owner: bool,
        fields: Option<Vec<String>>,
    },
    Resolver(Resolver),
}

impl RuleLeaf {
    /// Interpret a loose JSON leaf: truthy scalars allow, `"owner"` restricts to
    /// owned records, objects read `owner` / `fields`, everything else denies.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) if s == OWNER_SHORTHAND => RuleLeaf::OwnerOnly,
            Value::Object(map) => RuleLeaf::Scoped {
                owner: map.get("owner").is_some_and(is_truthy),
                fields: map.get("fields").and_then(string_list),
            },
            other if is_truthy(other) => RuleLeaf::Allow,
            _ => RuleLeaf::Deny,
        }
    }

    fn expand_owner(self) -> Self {
        match self {
            RuleLeaf::OwnerOnly => RuleLeaf::Scoped {
                owner: true,
                fields: None,
            },
            other => other,
        }
    }
}

/// Per-action leaves. Actions without an entry are denied.
#[derive(Debug, Clone, Default)]
pub struct ActionRules(BTreeMap<Action, RuleLeaf>);

impl ActionRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, action: Action, leaf: RuleLeaf) -> Self {
        self.0.insert(action, leaf);
        self
    }

    pub fn get(&self, action: Action) -> Option<&RuleLeaf> {
        self.0.get(&action)
    }

    /// Same leaf for all four actions.
    pub fn uniform(leaf: RuleLeaf) -> Self {
        Action::ALL
            .iter()
            .fold(Self::new(), |rules, action| rules.with(*action, leaf.clone()))
    }
}

/// What one role may do on one model.
#[derive(Debug, Clone)]
pub enum RoleRule {
    Leaf(RuleLeaf),
    PerAction(ActionRules),
}

impl RoleRule {
    pub fn allow() -> Self {
        RoleRule::Leaf(RuleLeaf::Allow)
    }

    pub fn deny() -> Self {
        RoleRule::Leaf(RuleLeaf::Deny)
    }

    pub fn owner() -> Self {
        RoleRule::Leaf(RuleLeaf::OwnerOnly)
    }

    pub fn scoped<I, S>(owner: bool, fields: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RoleRule::Leaf(RuleLeaf::Scoped {
            owner,
            fields: fields.map(|f| f.into_iter().map(Into::into).collect()),
        })
    }

    pub fn actions(rules: ActionRules) -> Self {
        RoleRule::PerAction(rules)
    }

    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&Role, &dyn ModelCatalog) -> RoleRule + Send + Sync + 'static,
    {
        RoleRule::Leaf(RuleLeaf::Resolver(Resolver::new(f)))
    }

    /// Interpret a loose JSON rule. Objects with at least one action key are
    /// per-action tables; other objects are role-wide scoped leaves.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) if map.keys().any(|k| k.parse::<Action>().is_ok()) => {
                let rules = map
                    .iter()
                    .filter_map(|(k, v)| Some((k.parse::<Action>().ok()?, RuleLeaf::from_value(v))))
                    .fold(ActionRules::new(), |rules, (action, leaf)| rules.with(action, leaf));
                RoleRule::PerAction(rules)
            }
            Value::Array(_) => RoleRule::deny(),
            other => RoleRule::Leaf(RuleLeaf::from_value(other)),
        }
    }

    /// Expand the `"owner"` shorthand into explicit per-action leaves.
    ///
    /// Registries call this once at load time so resolution never special-cases
    /// the shorthand. Resolver output is normalized the same way when produced.
    pub fn normalized(self) -> Self {
        match self {
            RoleRule::Leaf(RuleLeaf::OwnerOnly) => {
                RoleRule::PerAction(ActionRules::uniform(RuleLeaf::OwnerOnly.expand_owner()))
            }
            RoleRule::PerAction(ActionRules(rules)) => RoleRule::PerAction(ActionRules(
                rules
                    .into_iter()
                    .map(|(action, leaf)| (action, leaf.expand_owner()))
                    .collect(),
            )),
            other => other,
        }
    }
}

impl From<bool> for RoleRule {
    fn from(value: bool) -> Self {
        if value { RoleRule::allow() } else { RoleRule::deny() }
    }
}

/// A model's role declarations.
#[derive(Debug, Clone)]
pub enum RoleTable {
    ByRole(BTreeMap<Role, RoleRule>),
    /// One rule for every role (including a resolver rule).
    Uniform(RoleRule),
}

impl RoleTable {
    pub fn by_role<I, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (R, RoleRule)>,
        R: Into<Role>,
    {
        RoleTable::ByRole(entries.into_iter().map(|(r, rule)| (r.into(), rule)).collect())
    }

    pub fn uniform(rule: RoleRule) -> Self {
        RoleTable::Uniform(rule)
    }

    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&Role, &dyn ModelCatalog) -> RoleRule + Send + Sync + 'static,
    {
        RoleTable::Uniform(RoleRule::resolver(f))
    }

    /// Objects are keyed by role; any other value is a rule for every role.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => RoleTable::ByRole(
                map.iter()
                    .map(|(role, rule)| (Role::new(role.clone()), RoleRule::from_value(rule)))
                    .collect(),
            ),
            other => RoleTable::Uniform(RoleRule::from_value(other)),
        }
    }

    pub fn normalized(self) -> Self {
        match self {
            RoleTable::ByRole(map) => RoleTable::ByRole(
                map.into_iter().map(|(role, rule)| (role, rule.normalized())).collect(),
            ),
            RoleTable::Uniform(rule) => RoleTable::Uniform(rule.normalized()),
        }
    }

    /// Rule declared for `role`, if any.
    pub fn rule_for(&self, role: &Role) -> Option<&RoleRule> {
        match self {
            RoleTable::ByRole(map) => map.get(role),
            RoleTable::Uniform(rule) => Some(rule),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    })
}
