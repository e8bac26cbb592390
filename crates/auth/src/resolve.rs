//! Role resolution: `(role table, role, action) -> AccessPolicy`.
//!
//! - No IO
//! - No panics
//! - Never fails: every miss or ambiguity resolves to deny

use crate::{AccessPolicy, Action, ModelCatalog, Role, RoleRule, RoleTable, RuleLeaf};

/// Resolver rules may return further resolvers; chains deeper than this deny.
pub const MAX_RESOLVER_DEPTH: usize = 8;

/// Resolve the policy a role gets for an action under `table`.
///
/// A model without a table grants nothing.
pub fn resolve(
    table: Option<&RoleTable>,
    role: &Role,
    action: Action,
    catalog: &dyn ModelCatalog,
) -> AccessPolicy {
    let Some(rule) = table.and_then(|t| t.rule_for(role)) else {
        return AccessPolicy::deny();
    };
    resolve_rule(rule, role, action, catalog, 0)
}

fn resolve_rule(
    rule: &RoleRule,
    role: &Role,
    action: Action,
    catalog: &dyn ModelCatalog,
    depth: usize,
) -> AccessPolicy {
    match rule {
        RoleRule::Leaf(leaf) => resolve_leaf(leaf, role, action, catalog, depth),
        RoleRule::PerAction(rules) => match rules.get(action) {
            Some(leaf) => resolve_leaf(leaf, role, action, catalog, depth),
            None => AccessPolicy::deny(),
        },
    }
}

fn resolve_leaf(
    leaf: &RuleLeaf,
    role: &Role,
    action: Action,
    catalog: &dyn ModelCatalog,
    depth: usize,
) -> AccessPolicy {
    match leaf {
        RuleLeaf::Allow => AccessPolicy::allow(),
        RuleLeaf::Deny => AccessPolicy::deny(),
        RuleLeaf::OwnerOnly => AccessPolicy::owner(),
        RuleLeaf::Scoped { owner, fields } => AccessPolicy::scoped(*owner, fields.clone()),
        RuleLeaf::Resolver(resolver) => {
            if depth >= MAX_RESOLVER_DEPTH {
                tracing::warn!(role = %role, action = %action, "resolver chain too deep; denying");
                return AccessPolicy::deny();
            }
            let produced = resolver.call(role, catalog).normalized();
            resolve_rule(&produced, role, action, catalog, depth + 1)
        }
    }
}
