//! Model registry: the read-only set of models an orchestrator serves.
//!
//! Built once by [`ModelRegistry::initialize`]:
//!
//! ```text
//! definitions
//!   ↓
//! 1. Load: skip disabled models, bind each to its store, expand role shorthands
//!   ↓
//! 2. Wire ownership: owner model + foreign keys
//!   ↓
//! 3. Seed: run each model's seed hook (no authorization)
//!   ↓
//! ready (immutable, share behind `Arc`)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crudguard_auth::{ModelCatalog, Ownership, RoleTable};
use crudguard_core::ModelKey;

use crate::config::CrudConfig;
use crate::error::CrudError;
use crate::hooks::{ModelHooks, NoHooks};
use crate::store::{ModelStore, Storage};

/// What the application declares about one model.
#[derive(Clone)]
pub struct ModelDefinition {
    pub key: ModelKey,
    /// `None` grants nothing while authorization is enabled.
    pub roles: Option<RoleTable>,
    /// Overrides [`CrudConfig::owner_foreign_key`] for this model.
    pub owner_foreign_key: Option<String>,
    pub disabled: bool,
    pub hooks: Arc<dyn ModelHooks>,
}

impl ModelDefinition {
    pub fn new(key: impl Into<ModelKey>) -> Self {
        Self {
            key: key.into(),
            roles: None,
            owner_foreign_key: None,
            disabled: false,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn roles(mut self, table: RoleTable) -> Self {
        self.roles = Some(table);
        self
    }

    /// Role table in its JSON shorthand, e.g. `{"admin": 1, "user": "owner"}`.
    pub fn roles_json(self, table: &serde_json::Value) -> Self {
        self.roles(RoleTable::from_value(table))
    }

    pub fn owner_foreign_key(mut self, field: impl Into<String>) -> Self {
        self.owner_foreign_key = Some(field.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn hooks(mut self, hooks: impl ModelHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }
}

impl core::fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("key", &self.key)
            .field("roles", &self.roles)
            .field("owner_foreign_key", &self.owner_foreign_key)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

/// A loaded model, immutable after initialization.
#[derive(Clone)]
pub struct ModelDescriptor {
    pub key: ModelKey,
    /// Normalized: `"owner"` shorthands are already expanded.
    pub roles: Option<RoleTable>,
    /// `None` when no owner model is configured.
    pub ownership: Option<Ownership>,
    pub hooks: Arc<dyn ModelHooks>,
    pub store: Arc<dyn ModelStore>,
}

impl core::fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("key", &self.key)
            .field("roles", &self.roles)
            .field("ownership", &self.ownership)
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

pub struct ModelRegistry {
    config: CrudConfig,
    storage: Arc<dyn Storage>,
    models: BTreeMap<ModelKey, ModelDescriptor>,
}

impl ModelRegistry {
    /// Load, wire and seed the given definitions.
    pub async fn initialize<I>(
        config: CrudConfig,
        storage: Arc<dyn Storage>,
        definitions: I,
    ) -> Result<Self, CrudError>
    where
        I: IntoIterator<Item = ModelDefinition>,
    {
        config.validate()?;

        // 1. load
        let mut loaded: Vec<(ModelDefinition, Arc<dyn ModelStore>)> = Vec::new();
        for definition in definitions {
            if definition.disabled {
                tracing::debug!(model = %definition.key, "model disabled; skipping");
                continue;
            }
            let store = storage.model(definition.key.as_str()).ok_or_else(|| {
                CrudError::config(format!("no store backs model '{}'", definition.key))
            })?;
            loaded.push((definition, store));
        }

        // 2. wire ownership
        let owner_key = Self::owner_key(&config, &loaded)?;

        let mut order = Vec::with_capacity(loaded.len());
        let mut models = BTreeMap::new();
        for (definition, store) in loaded {
            let ownership = owner_key.as_ref().map(|(owner_model, owner_pk)| {
                if definition.key.as_str() == owner_model.as_str() {
                    Ownership::of_owner_model(owner_pk.clone())
                } else {
                    let foreign_key = definition
                        .owner_foreign_key
                        .clone()
                        .unwrap_or_else(|| config.owner_foreign_key.clone());
                    Ownership::new(foreign_key, owner_pk.clone())
                }
            });

            let descriptor = ModelDescriptor {
                key: definition.key.clone(),
                roles: definition.roles.map(RoleTable::normalized),
                ownership,
                hooks: definition.hooks,
                store,
            };
            order.push(definition.key.clone());
            models.insert(definition.key, descriptor);
        }

        // 3. seed, in definition order
        for key in &order {
            if let Some(descriptor) = models.get(key) {
                descriptor
                    .hooks
                    .seed(descriptor.store.as_ref())
                    .await
                    .map_err(CrudError::Hook)?;
            }
        }

        tracing::info!(
            models = models.len(),
            auth_enabled = config.auth_enabled,
            owner_model = ?config.model_owner,
            "model registry ready"
        );

        Ok(Self {
            config,
            storage,
            models,
        })
    }

    /// `(owner model key, owner primary-key field)` when ownership is in effect.
    fn owner_key(
        config: &CrudConfig,
        loaded: &[(ModelDefinition, Arc<dyn ModelStore>)],
    ) -> Result<Option<(String, String)>, CrudError> {
        let Some(owner) = config.model_owner.as_deref() else {
            return Ok(None);
        };

        match loaded.iter().find(|(def, _)| def.key.as_str() == owner) {
            Some((_, store)) => Ok(Some((owner.to_string(), store.primary_key().field.clone()))),
            None if config.auth_enabled => Err(CrudError::config(format!(
                "No model for owners found with key \"{owner}\""
            ))),
            None => {
                tracing::warn!(owner_model = owner, "owner model not loaded; ownership disabled");
                Ok(None)
            }
        }
    }

    pub fn config(&self) -> &CrudConfig {
        &self.config
    }

    pub fn model(&self, key: &str) -> Result<&ModelDescriptor, CrudError> {
        self.models
            .get(key)
            .ok_or_else(|| CrudError::UnknownModel(key.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }

    /// Close the backing storage. Model handles fail afterwards.
    pub async fn shutdown(&self) -> Result<(), CrudError> {
        self.storage.close().await?;
        tracing::info!("model registry shut down");
        Ok(())
    }
}

impl ModelCatalog for ModelRegistry {
    fn model_keys(&self) -> Vec<&str> {
        self.models.keys().map(ModelKey::as_str).collect()
    }

    fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    fn owner_model(&self) -> Option<&str> {
        self.config
            .model_owner
            .as_deref()
            .filter(|owner| self.models.contains_key(*owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStorage, ModelSchema, PrimaryKey};
    use serde_json::json;

    fn storage() -> Arc<InMemoryStorage> {
        let storage = InMemoryStorage::arc();
        storage
            .define(ModelSchema::new("User", PrimaryKey::auto_increment("id")))
            .unwrap();
        storage
            .define(ModelSchema::new("Task", PrimaryKey::auto_increment("id")))
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn wires_ownership_for_owned_and_owner_models() {
        let registry = ModelRegistry::initialize(
            CrudConfig::default(),
            storage(),
            [
                ModelDefinition::new("User").roles_json(&json!({"user": "owner"})),
                ModelDefinition::new("Task")
                    .roles_json(&json!({"user": "owner"}))
                    .owner_foreign_key("author_id"),
            ],
        )
        .await
        .unwrap();

        let task = registry.model("Task").unwrap();
        assert_eq!(task.ownership, Some(Ownership::new("author_id", "id")));
        let user = registry.model("User").unwrap();
        assert_eq!(user.ownership, Some(Ownership::of_owner_model("id")));
        assert_eq!(registry.owner_model(), Some("User"));
    }

    #[tokio::test]
    async fn disabled_models_are_unknown() {
        let registry = ModelRegistry::initialize(
            CrudConfig::default(),
            storage(),
            [
                ModelDefinition::new("User"),
                ModelDefinition::new("Task").disabled(true),
            ],
        )
        .await
        .unwrap();

        assert!(matches!(registry.model("Task"), Err(CrudError::UnknownModel(_))));
        assert_eq!(registry.model_keys(), vec!["User"]);
    }

    #[tokio::test]
    async fn missing_owner_model_is_a_config_error_when_auth_is_on() {
        let err = ModelRegistry::initialize(
            CrudConfig::default(),
            storage(),
            [ModelDefinition::new("Task")],
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, CrudError::Config(_)));

        let registry = ModelRegistry::initialize(
            CrudConfig::default().without_auth(),
            storage(),
            [ModelDefinition::new("Task")],
        )
        .await
        .unwrap();
        assert_eq!(registry.model("Task").unwrap().ownership, None);
    }

    #[tokio::test]
    async fn definition_without_store_is_rejected() {
        let err = ModelRegistry::initialize(
            CrudConfig::default().with_model_owner(None),
            storage(),
            [ModelDefinition::new("Project")],
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, CrudError::Config(ref m) if m.contains("Project")));
    }
}
