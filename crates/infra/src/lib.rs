//! `crudguard-infra`: storage boundary, model registry and the CRUD orchestrator.
//!
//! Typical wiring:
//!
//! ```text
//! CrudConfig + Storage + [ModelDefinition]
//!   ↓  ModelRegistry::initialize
//! Arc<ModelRegistry>
//!   ↓  Crud::new
//! crud.create / read / update / delete / clone_record
//! ```

pub mod augment;
pub mod config;
pub mod crud;
pub mod error;
pub mod hooks;
pub mod registry;
pub mod store;

pub use config::CrudConfig;
pub use crud::{
    CloneRequest, CreateInput, CreateOutput, Crud, CrudOptions, DeleteTarget, ReadOutput,
    ReadTarget, UpdateBatch, UpdateOutcome, UpdateResults,
};
pub use error::CrudError;
pub use hooks::{ModelHooks, NoHooks};
pub use registry::{ModelDefinition, ModelDescriptor, ModelRegistry};
pub use store::{
    InMemoryModel, InMemoryStorage, KeyGeneration, ModelSchema, ModelStore, PrimaryKey, Scope,
    Storage, StoreError,
};
