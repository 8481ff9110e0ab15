//! In-memory collaborators for unit testing
//!
//! `MockBootStore` implements both `ObjectStore` and `BootRecordStore` over
//! in-memory maps and records every lookup so tests can assert which
//! collaborator calls an engine operation made (or did not make).

use super::{BootRecordStore, ObjectKey, ObjectStore};
use crate::error::StoreError;
use crate::types::{Assignment, Profile, Selector};
use crds::BuildArch;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetObject(String),
    GetProfile(String),
    FindAssignmentBySelector(Selector),
    FindDefaultAssignment(BuildArch),
    FindProfilesByContentId(Uuid),
}

/// Mock object store and boot record store
#[derive(Clone, Default)]
pub struct MockBootStore {
    objects: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    profiles: Arc<Mutex<HashMap<String, Profile>>>,
    assignments: Arc<Mutex<Vec<Assignment>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

fn object_id(key: ObjectKey<'_>) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        key.group, key.version, key.resource, key.namespace, key.name
    )
}

impl MockBootStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an external object (for test setup)
    pub fn add_object(&self, reference: &crds::ObjectRef, object: serde_json::Value) {
        self.objects
            .lock()
            .expect("mock lock poisoned")
            .insert(object_id(reference.into()), object);
    }

    /// Add a profile (for test setup)
    pub fn add_profile(&self, profile: Profile) {
        self.profiles
            .lock()
            .expect("mock lock poisoned")
            .insert(profile.name.clone(), profile);
    }

    /// Add an assignment (for test setup)
    pub fn add_assignment(&self, assignment: Assignment) {
        self.assignments
            .lock()
            .expect("mock lock poisoned")
            .push(assignment);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().expect("mock lock poisoned").push(call);
    }

    fn first_assignment(&self, accept: impl Fn(&Assignment) -> bool) -> Option<Assignment> {
        let assignments = self.assignments.lock().expect("mock lock poisoned");
        let mut matching: Vec<&Assignment> = assignments.iter().filter(|a| accept(a)).collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        matching.first().map(|a| (*a).clone())
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockBootStore {
    async fn get_object(&self, key: ObjectKey<'_>) -> Result<serde_json::Value, StoreError> {
        let id = object_id(key);
        self.record(StoreCall::GetObject(id.clone()));
        self.objects
            .lock()
            .expect("mock lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}

#[async_trait::async_trait]
impl BootRecordStore for MockBootStore {
    async fn get_profile(&self, name: &str) -> Result<Profile, StoreError> {
        self.record(StoreCall::GetProfile(name.to_string()));
        self.profiles
            .lock()
            .expect("mock lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("profile {name}")))
    }

    async fn find_assignment_by_selector(&self, selector: &Selector) -> Result<Assignment, StoreError> {
        self.record(StoreCall::FindAssignmentBySelector(*selector));
        self.first_assignment(|a| {
            !a.is_default
                && a.subject_selectors.selects_machine(selector.uuid, selector.build_arch)
        })
        .ok_or_else(|| StoreError::NotFound(format!("assignment for {selector}")))
    }

    async fn find_default_assignment(&self, build_arch: BuildArch) -> Result<Assignment, StoreError> {
        self.record(StoreCall::FindDefaultAssignment(build_arch));
        self.first_assignment(|a| a.is_default && a.subject_selectors.buildarch.contains(&build_arch))
            .ok_or_else(|| StoreError::NotFound(format!("default assignment for {build_arch}")))
    }

    async fn find_profiles_by_content_id(&self, id: Uuid) -> Result<Vec<Profile>, StoreError> {
        self.record(StoreCall::FindProfilesByContentId(id));
        let profiles = self.profiles.lock().expect("mock lock poisoned");
        let mut found: Vec<Profile> = profiles
            .values()
            .filter(|p| p.content_id_to_name.contains_key(&id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}
