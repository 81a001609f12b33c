//! Upload authorization.
//!
//! The pipeline does not make authorization decisions; it asks an
//! [`UploadAuthorizer`] once, before any validation work, and refuses the
//! submission if the answer is no.

use std::collections::{HashMap, HashSet};

use courtlist_core::ListType;

/// Capability check consulted before a submission is examined.
pub trait UploadAuthorizer: Send + Sync {
    /// Whether `identity` may publish lists of `list_type`.
    fn can_upload(&self, identity: &str, list_type: &ListType) -> bool;
}

/// Authorizes everything. For trusted internal callers and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl UploadAuthorizer for AllowAll {
    fn can_upload(&self, _identity: &str, _list_type: &ListType) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
enum Grant {
    Any,
    Only(HashSet<ListType>),
}

/// Explicit per-identity grants. Identities without a grant are refused.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    grants: HashMap<String, Grant>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `identity` to publish `list_type`.
    pub fn grant(mut self, identity: impl Into<String>, list_type: ListType) -> Self {
        match self
            .grants
            .entry(identity.into())
            .or_insert_with(|| Grant::Only(HashSet::new()))
        {
            Grant::Any => {}
            Grant::Only(types) => {
                types.insert(list_type);
            }
        }
        self
    }

    /// Allow `identity` to publish every list type.
    pub fn grant_all(mut self, identity: impl Into<String>) -> Self {
        self.grants.insert(identity.into(), Grant::Any);
        self
    }
}

impl UploadAuthorizer for AllowList {
    fn can_upload(&self, identity: &str, list_type: &ListType) -> bool {
        match self.grants.get(identity) {
            Some(Grant::Any) => true,
            Some(Grant::Only(types)) => types.contains(list_type),
            None => false,
        }
    }
}
