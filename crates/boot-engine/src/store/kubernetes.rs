//! Kubernetes-backed collaborators
//!
//! Arbitrary objects are read through the dynamic API. Profiles and
//! Assignments are looked up with label selectors over the derived index
//! labels from `crds::labels`.

use super::{BootRecordStore, ObjectKey, ObjectStore};
use crate::error::StoreError;
use crate::types::{Assignment, Profile, Selector};
use crds::{labels, BuildArch};
use kube::api::{ApiResource, DynamicObject, ListParams};
use kube::{Api, Client};
use tracing::{debug, warn};
use uuid::Uuid;

/// Map a kube 404 onto `StoreError::NotFound`
fn not_found_or(err: kube::Error, what: impl FnOnce() -> String) -> StoreError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound(what()),
        other => StoreError::Kube(other),
    }
}

/// Reads arbitrary objects through the dynamic API
#[derive(Clone)]
pub struct KubeObjectStore {
    client: Client,
}

impl KubeObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ObjectStore for KubeObjectStore {
    async fn get_object(&self, key: ObjectKey<'_>) -> Result<serde_json::Value, StoreError> {
        let api_version = if key.group.is_empty() {
            key.version.to_string()
        } else {
            format!("{}/{}", key.group, key.version)
        };
        // Only the plural is used to build the request path
        let resource = ApiResource {
            group: key.group.to_string(),
            version: key.version.to_string(),
            api_version,
            kind: String::new(),
            plural: key.resource.to_string(),
        };
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), key.namespace, &resource);

        debug!(
            resource = key.resource,
            namespace = key.namespace,
            name = key.name,
            "Fetching object"
        );
        let object = api.get(key.name).await.map_err(|e| {
            not_found_or(e, || {
                format!("{} {}/{}", key.resource, key.namespace, key.name)
            })
        })?;
        Ok(serde_json::to_value(&object)?)
    }
}

/// Profile and Assignment lookups within one namespace
#[derive(Clone)]
pub struct KubeBootRecordStore {
    profiles: Api<crds::Profile>,
    assignments: Api<crds::Assignment>,
}

impl KubeBootRecordStore {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            profiles: Api::namespaced(client.clone(), namespace),
            assignments: Api::namespaced(client, namespace),
        }
    }

    /// First assignment (by name) matching `selector`, converted and filtered by `accept`
    async fn find_assignment(
        &self,
        label_selector: &str,
        accept: impl Fn(&crds::AssignmentSpec) -> bool,
        what: String,
    ) -> Result<Assignment, StoreError> {
        let list = self
            .assignments
            .list(&ListParams::default().labels(label_selector))
            .await?;

        // Labels are written asynchronously; re-check the selectors themselves
        let mut matching: Vec<&crds::Assignment> =
            list.items.iter().filter(|a| accept(&a.spec)).collect();
        matching.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));

        if matching.len() > 1 {
            warn!(
                selector = label_selector,
                count = matching.len(),
                "Multiple assignments match, using the first by name"
            );
        }
        match matching.first() {
            Some(assignment) => Assignment::from_resource(assignment),
            None => Err(StoreError::NotFound(what)),
        }
    }
}

#[async_trait::async_trait]
impl BootRecordStore for KubeBootRecordStore {
    async fn get_profile(&self, name: &str) -> Result<Profile, StoreError> {
        let resource = self
            .profiles
            .get(name)
            .await
            .map_err(|e| not_found_or(e, || format!("profile {name}")))?;
        Profile::from_resource(&resource)
    }

    async fn find_assignment_by_selector(&self, selector: &Selector) -> Result<Assignment, StoreError> {
        self.find_assignment(
            &labels::selector_for_machine(selector.uuid, selector.build_arch),
            |spec| spec.matches(selector.uuid, selector.build_arch),
            format!("assignment for {selector}"),
        )
        .await
    }

    async fn find_default_assignment(&self, build_arch: BuildArch) -> Result<Assignment, StoreError> {
        self.find_assignment(
            &labels::selector_for_default(build_arch),
            |spec| spec.is_default_for(build_arch),
            format!("default assignment for {build_arch}"),
        )
        .await
    }

    async fn find_profiles_by_content_id(&self, id: Uuid) -> Result<Vec<Profile>, StoreError> {
        let list = self
            .profiles
            .list(&ListParams::default().labels(&labels::selector_for_content_id(id)))
            .await?;
        list.items
            .iter()
            .map(Profile::from_resource)
            .filter(|p| !matches!(p, Ok(profile) if profile.content_by_id(id).is_none()))
            .collect()
    }
}
