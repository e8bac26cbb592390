use crudguard_core::record::merge;
use crudguard_core::{Record, RecordKey, TIMESTAMP_FIELDS};

use super::{Crud, CrudOptions, ReadOutput, ReadTarget};
use crate::error::CrudError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloneRequest {
    pub source: Option<RecordKey>,
    /// Deep-merged over the draft after the before-clone hook.
    pub properties: Option<Record>,
}

impl CloneRequest {
    pub fn of(source: impl Into<RecordKey>) -> Self {
        Self {
            source: Some(source.into()),
            properties: None,
        }
    }

    pub fn properties(mut self, properties: Record) -> Self {
        self.properties = Some(properties);
        self
    }
}

impl Crud {
    /// Duplicate a record the caller can read into a new record they create.
    ///
    /// ```text
    /// read source (read policy, caller scopes)
    ///   ↓
    /// draft = source - pk - timestamps
    ///   ↓
    /// before_clone hook → merge properties
    ///   ↓
    /// create (create policy, caller credentials only)
    ///   ↓
    /// after_clone hook
    /// ```
    ///
    /// Returns the created record as the after-clone hook left it.
    #[tracing::instrument(name = "crud.clone", skip_all, fields(model = %model))]
    pub async fn clone_record(
        &self,
        model: &str,
        request: CloneRequest,
        options: &CrudOptions,
    ) -> Result<Record, CrudError> {
        let key = request.source.ok_or(CrudError::CloneMissingSrcKey)?;

        let source = match self.read(model, ReadTarget::One(key.clone()), options).await? {
            ReadOutput::One(Some(record)) => record,
            _ => return Err(CrudError::CloneSrcNotFound(key.to_string())),
        };

        let descriptor = self.registry.model(model)?;
        let mut draft = source.clone();
        draft.remove(&descriptor.store.primary_key().field);
        for field in TIMESTAMP_FIELDS {
            draft.remove(field);
        }

        descriptor
            .hooks
            .before_clone(&mut draft, &source, self, options)
            .await
            .map_err(CrudError::Hook)?;

        if let Some(properties) = &request.properties {
            merge(&mut draft, properties);
        }

        let create_options = CrudOptions {
            credentials: options.credentials.clone(),
            ..CrudOptions::default()
        };
        let mut created = self.create_one(model, draft, &create_options).await?;

        descriptor
            .hooks
            .after_clone(&mut created, &source, self, options)
            .await
            .map_err(CrudError::Hook)?;

        tracing::debug!(model, source = %key, "record cloned");
        Ok(created)
    }
}
