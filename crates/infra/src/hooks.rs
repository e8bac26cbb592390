//! Per-model lifecycle hooks.
//!
//! Hooks are an optional capability of a model definition. Every method has a
//! no-op default, so a model implements only the points it cares about. All
//! hooks are awaited in place: a slow hook delays its own record's operation
//! and nothing else.

use crudguard_core::{Query, Record, RecordKey};

use crate::crud::{Crud, CrudOptions, UpdateOutcome};
use crate::store::ModelStore;

#[async_trait::async_trait]
pub trait ModelHooks: Send + Sync {
    /// Populate initial rows during registry initialization. Runs without
    /// authorization, directly against the model store.
    async fn seed(&self, _store: &dyn ModelStore) -> anyhow::Result<()> {
        Ok(())
    }

    /// Transform (or reject) a patch before it is written. A rejection fails
    /// only this key of the update batch.
    async fn before_update(
        &self,
        patch: Record,
        _key: &RecordKey,
        _query: &Query,
    ) -> anyhow::Result<Record> {
        Ok(patch)
    }

    /// Runs after the write; may attach side-channel data to `outcome.extra`.
    async fn after_update(
        &self,
        _patch: &Record,
        _key: &RecordKey,
        _query: &Query,
        _outcome: &mut UpdateOutcome,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Adjust the clone draft before caller overrides are merged in.
    ///
    /// `options` are the clone caller's; `crud` reaches the other models.
    async fn before_clone(
        &self,
        _draft: &mut Record,
        _source: &Record,
        _crud: &Crud,
        _options: &CrudOptions,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Follow-up work once the clone exists (e.g. copying related rows
    /// through `crud` under the caller's `options`).
    ///
    /// `created` is what the clone call returns. Changes meant to persist must
    /// be written through a store or `crud`.
    async fn after_clone(
        &self,
        _created: &mut Record,
        _source: &Record,
        _crud: &Crud,
        _options: &CrudOptions,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hooks of a model that declares none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl ModelHooks for NoHooks {}
