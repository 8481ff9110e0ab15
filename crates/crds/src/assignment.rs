//! Assignment CRD
//!
//! Binds machines (by UUID and build architecture) to a Profile, or marks a
//! Profile as the default for an architecture.

use crate::build_arch::BuildArch;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "dcops.microscaler.io",
    version = "v1alpha1",
    kind = "Assignment",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSpec {
    /// Machines this assignment applies to
    #[serde(default)]
    pub subject_selectors: SubjectSelectors,

    /// Name of the Profile (same namespace)
    pub profile_name: String,

    /// Default assignment for every architecture in `subjectSelectors.buildarch`
    ///
    /// Mutually exclusive with a non-empty `subjectSelectors.uuidList`.
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSelectors {
    /// Build architectures matched by this assignment
    ///
    /// Left empty, a non-default assignment matches every architecture.
    #[serde(default)]
    pub buildarch: Vec<BuildArch>,

    /// Machine UUIDs matched by this assignment
    #[serde(default)]
    pub uuid_list: Vec<Uuid>,
}

impl SubjectSelectors {
    /// Architectures a non-default assignment with these selectors applies to
    pub fn machine_archs(&self) -> &[BuildArch] {
        if self.buildarch.is_empty() {
            &BuildArch::ALL
        } else {
            &self.buildarch
        }
    }

    /// True when `uuid` on `arch` is listed by these selectors
    pub fn selects_machine(&self, uuid: Uuid, arch: BuildArch) -> bool {
        self.uuid_list.contains(&uuid) && self.machine_archs().contains(&arch)
    }
}

impl AssignmentSpec {
    /// True when this assignment selects the given machine explicitly
    pub fn matches(&self, uuid: Uuid, arch: BuildArch) -> bool {
        !self.is_default && self.subject_selectors.selects_machine(uuid, arch)
    }

    /// True when this is the default assignment for `arch`
    pub fn is_default_for(&self, arch: BuildArch) -> bool {
        self.is_default && self.subject_selectors.buildarch.contains(&arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(uuids: Vec<Uuid>, archs: Vec<BuildArch>, is_default: bool) -> AssignmentSpec {
        AssignmentSpec {
            subject_selectors: SubjectSelectors {
                buildarch: archs,
                uuid_list: uuids,
            },
            profile_name: "p".to_string(),
            is_default,
        }
    }

    #[test]
    fn test_matches_requires_uuid_and_arch() {
        let id = Uuid::new_v4();
        let s = spec(vec![id], vec![BuildArch::X86_64], false);
        assert!(s.matches(id, BuildArch::X86_64));
        assert!(!s.matches(id, BuildArch::Arm64));
        assert!(!s.matches(Uuid::new_v4(), BuildArch::X86_64));
    }

    #[test]
    fn test_uuid_only_selectors_match_any_arch() {
        let id = Uuid::new_v4();
        let s = spec(vec![id], vec![], false);
        for arch in BuildArch::ALL {
            assert!(s.matches(id, arch), "{arch}");
        }
        assert!(!s.matches(Uuid::new_v4(), BuildArch::X86_64));
    }

    #[test]
    fn test_default_without_archs_matches_nothing() {
        let s = spec(vec![], vec![], true);
        assert!(!s.is_default_for(BuildArch::X86_64));
    }

    #[test]
    fn test_default_never_matches_by_uuid() {
        let s = spec(vec![], vec![BuildArch::Arm64], true);
        assert!(s.is_default_for(BuildArch::Arm64));
        assert!(!s.is_default_for(BuildArch::I386));
        assert!(!s.matches(Uuid::nil(), BuildArch::Arm64));
    }
}
