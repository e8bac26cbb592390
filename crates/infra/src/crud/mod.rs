//! CRUD orchestrator: authorization-aware create/read/update/delete/clone.
//!
//! Every operation runs the same per-call pipeline:
//!
//! ```text
//! (model, payload, options)
//!   ↓
//! 1. Resolve the model from the registry        (UnknownModel)
//!   ↓
//! 2. Resolve the policy for the caller's role   (MissingCredentials / Unauthorized)
//!   ↓
//! 3. Augment the query / restrict the payload   (UnresolvedOwner)
//!   ↓
//! 4. Delegate to the model store, record by record
//!   ↓
//! 5. Post-process (hooks, result shape)
//! ```
//!
//! Steps 1-3 reject the whole call before any storage access. Failures in
//! step 4 and 5 are captured per record for batch inputs and propagate
//! directly for singular ones. With authorization disabled, steps 2 and 3
//! are skipped.

mod clone;
mod create;
mod delete;
mod read;
mod update;

pub use clone::CloneRequest;
pub use create::{CreateInput, CreateOutput};
pub use delete::DeleteTarget;
pub use read::{ReadOutput, ReadTarget};
pub use update::{UpdateBatch, UpdateOutcome, UpdateResults};

use std::sync::Arc;

use crudguard_auth::{AccessPolicy, Action, AuthRequest, Credentials, authorize};
use crudguard_core::Query;

use crate::augment::augment;
use crate::error::CrudError;
use crate::registry::{ModelDescriptor, ModelRegistry};

/// Per-call options shared by every operation.
#[derive(Debug, Clone, Default)]
pub struct CrudOptions {
    /// Required while authorization is enabled.
    pub credentials: Option<Credentials>,
    /// Caller filter, projection, scopes and pagination.
    pub query: Query,
    /// Create batches with one all-or-nothing insert.
    pub bulk: bool,
}

impl CrudOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_caller(credentials: Credentials) -> Self {
        Self::new().credentials(credentials)
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.query.scopes.push(name.into());
        self
    }

    pub fn bulk(mut self) -> Self {
        self.bulk = true;
        self
    }
}

/// Outcome of steps 1-2 for one call.
struct Guard<'r> {
    descriptor: &'r ModelDescriptor,
    action: Action,
    /// `None` when authorization is disabled.
    policy: Option<AccessPolicy>,
}

/// The orchestrator. Cheap to clone; all state lives in the shared registry.
#[derive(Clone)]
pub struct Crud {
    registry: Arc<ModelRegistry>,
}

impl Crud {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    fn request<'a>(
        &'a self,
        descriptor: &'a ModelDescriptor,
        action: Action,
        options: &'a CrudOptions,
    ) -> AuthRequest<'a> {
        AuthRequest {
            model: descriptor.key.as_str(),
            action,
            table: descriptor.roles.as_ref(),
            ownership: descriptor.ownership.as_ref(),
            credentials: options.credentials.as_ref(),
            roles_property: &self.registry.config().roles_property,
        }
    }

    fn guard(&self, model: &str, action: Action, options: &CrudOptions) -> Result<Guard<'_>, CrudError> {
        let descriptor = self.registry.model(model)?;

        if !self.registry.config().auth_enabled {
            return Ok(Guard {
                descriptor,
                action,
                policy: None,
            });
        }

        let request = self.request(descriptor, action, options);
        let policy = authorize(&request, &*self.registry)?;
        Ok(Guard {
            descriptor,
            action,
            policy: Some(policy),
        })
    }

    /// `base` with the guard's policy folded in.
    fn scoped(&self, guard: &Guard<'_>, options: &CrudOptions, base: &Query) -> Result<Query, CrudError> {
        match &guard.policy {
            None => Ok(base.clone()),
            Some(policy) => augment(base, policy, &self.request(guard.descriptor, guard.action, options)),
        }
    }
}
