use crudguard_auth::Action;
use crudguard_core::{Clause, Condition, RecordKey};

use super::{Crud, CrudOptions};
use crate::error::CrudError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    /// `pk IN keys`, further narrowed by the caller's filter and the policy.
    Keys(Vec<RecordKey>),
    /// Whatever the caller's (augmented) filter matches.
    Matching,
}

impl From<Vec<RecordKey>> for DeleteTarget {
    fn from(keys: Vec<RecordKey>) -> Self {
        DeleteTarget::Keys(keys)
    }
}

impl From<RecordKey> for DeleteTarget {
    fn from(key: RecordKey) -> Self {
        DeleteTarget::Keys(vec![key])
    }
}

impl Crud {
    /// Delete records and return how many went away.
    ///
    /// Authorized under the `delete` action of the model's role table.
    #[tracing::instrument(name = "crud.delete", skip_all, fields(model = %model))]
    pub async fn delete(
        &self,
        model: &str,
        target: DeleteTarget,
        options: &CrudOptions,
    ) -> Result<u64, CrudError> {
        let guard = self.guard(model, Action::Delete, options)?;
        let store = &guard.descriptor.store;

        let mut base = options.query.clone();
        if let DeleteTarget::Keys(keys) = target {
            let pk = store.primary_key();
            base.and(Clause::new(
                pk.field.clone(),
                Condition::In(keys.iter().map(|key| pk.key_value(key)).collect()),
            ));
        }

        let query = self.scoped(&guard, options, &base)?;
        let deleted = store.destroy(&query).await?;
        tracing::debug!(model, deleted, "records deleted");
        Ok(deleted)
    }
}
