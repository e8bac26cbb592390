//! `crudguard-auth`: pure role-based authorization for CRUD actions.
//!
//! This crate is intentionally decoupled from storage: it turns a role table,
//! a caller's credentials and an action into an [`AccessPolicy`].

pub mod action;
pub mod authorize;
pub mod catalog;
pub mod credentials;
pub mod policy;
pub mod resolve;
pub mod roles;
pub mod rule;

pub use action::Action;
pub use authorize::{AuthRequest, AuthzError, Ownership, authorize};
pub use catalog::{EmptyCatalog, ModelCatalog};
pub use credentials::Credentials;
pub use policy::AccessPolicy;
pub use resolve::{MAX_RESOLVER_DEPTH, resolve};
pub use roles::Role;
pub use rule::{ActionRules, OWNER_SHORTHAND, Resolver, RoleRule, RoleTable, RuleLeaf};
