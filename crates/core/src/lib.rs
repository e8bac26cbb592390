//! `crudguard-core`: value building blocks shared by every layer.
//!
//! This crate contains **pure** primitives (no storage, no authorization policy).

pub mod error;
pub mod id;
pub mod query;
pub mod record;

pub use error::{DomainError, DomainResult};
pub use id::{ModelKey, RecordKey};
pub use query::{Clause, Condition, Query};
pub use record::{Record, TIMESTAMP_FIELDS};
