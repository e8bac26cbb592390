/// Read-only view of the registered models, handed to resolver rules.
///
/// The model registry implements this; resolution itself never needs more
/// than the set of model keys and which one represents owners.
pub trait ModelCatalog: Send + Sync {
    fn model_keys(&self) -> Vec<&str>;

    fn contains(&self, key: &str) -> bool {
        self.model_keys().contains(&key)
    }

    /// Key of the model whose records are owners, if ownership is configured.
    fn owner_model(&self) -> Option<&str>;
}

/// Catalog with no models, for resolving tables outside a registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyCatalog;

impl ModelCatalog for EmptyCatalog {
    fn model_keys(&self) -> Vec<&str> {
        Vec::new()
    }

    fn owner_model(&self) -> Option<&str> {
        None
    }
}
