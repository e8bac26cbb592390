use serde::Serialize;

/// Resolved decision for one (model, role, action) evaluation.
///
/// Computed fresh for every call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPolicy {
    pub allowed: bool,
    /// Limit the action to records whose owner field equals the caller's id.
    pub owner_restricted: bool,
    /// Fields the action may read or write. `None` means no field restriction.
    pub fields: Option<Vec<String>>,
}

impl AccessPolicy {
    pub fn deny() -> Self {
        Self {
            allowed: false,
            owner_restricted: false,
            fields: None,
        }
    }

    pub fn allow() -> Self {
        Self {
            allowed: true,
            owner_restricted: false,
            fields: None,
        }
    }

    pub fn owner() -> Self {
        Self {
            allowed: true,
            owner_restricted: true,
            fields: None,
        }
    }

    pub fn scoped(owner: bool, fields: Option<Vec<String>>) -> Self {
        Self {
            allowed: true,
            owner_restricted: owner,
            fields,
        }
    }
}
