//! Storage boundary: per-model query execution behind async traits.
//!
//! The orchestrator only ever talks to [`ModelStore`] / [`Storage`]; the
//! in-memory adapter is the reference implementation used by tests and
//! development setups.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryModel, InMemoryStorage, ModelSchema, Scope};
pub use r#trait::{KeyGeneration, ModelStore, PrimaryKey, Storage, StoreError};
