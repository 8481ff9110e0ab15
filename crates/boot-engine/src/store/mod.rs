//! External collaborators consumed by the engine
//!
//! The engine only ever reads through these traits. The Kubernetes-backed
//! implementations live in `kubernetes`; an in-memory implementation for tests lives
//! in `mock` (feature `test-util`).

pub mod kubernetes;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

use crate::error::StoreError;
use crate::types::{Assignment, Profile, Selector};
use crds::BuildArch;
use uuid::Uuid;

/// Group/version/resource coordinates of an external object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey<'a> {
    pub group: &'a str,
    pub version: &'a str,
    pub resource: &'a str,
    pub namespace: &'a str,
    pub name: &'a str,
}

impl<'a> From<&'a crds::ObjectRef> for ObjectKey<'a> {
    fn from(r: &'a crds::ObjectRef) -> Self {
        Self {
            group: &r.group,
            version: &r.version,
            resource: &r.resource,
            namespace: &r.namespace,
            name: &r.name,
        }
    }
}

/// Read access to arbitrary external objects as structured documents
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one object; `StoreError::NotFound` when it does not exist
    async fn get_object(&self, key: ObjectKey<'_>) -> Result<serde_json::Value, StoreError>;
}

/// Read access to Profile and Assignment records
#[async_trait::async_trait]
pub trait BootRecordStore: Send + Sync {
    async fn get_profile(&self, name: &str) -> Result<Profile, StoreError>;

    /// Assignment explicitly selecting this machine; `NotFound` when none does
    async fn find_assignment_by_selector(&self, selector: &Selector) -> Result<Assignment, StoreError>;

    /// Default assignment for an architecture; `NotFound` when none exists
    async fn find_default_assignment(&self, build_arch: BuildArch) -> Result<Assignment, StoreError>;

    /// Every profile exposing this content ID (normally exactly one)
    async fn find_profiles_by_content_id(&self, id: Uuid) -> Result<Vec<Profile>, StoreError>;
}
