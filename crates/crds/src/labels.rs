//! Derived index labels
//!
//! Assignments and Profiles carry labels derived from their spec/status so the
//! boot server can find them with a single label-selector list call. The
//! reconciler writes these labels; the lookup side builds selectors from the
//! same functions so the two never disagree.

use crate::assignment::AssignmentSpec;
use crate::build_arch::BuildArch;
use crate::profile::ProfileStatus;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Prefix of per-UUID assignment labels
pub const UUID_LABEL_PREFIX: &str = "uuid.dcops.microscaler.io";
/// Prefix of per-architecture assignment labels
pub const BUILDARCH_LABEL_PREFIX: &str = "buildarch.dcops.microscaler.io";
/// Prefix of per-architecture default assignment labels
pub const DEFAULT_LABEL_PREFIX: &str = "default.dcops.microscaler.io";
/// Prefix of exposed content ID labels on profiles
pub const CONTENT_ID_LABEL_PREFIX: &str = "content-id.dcops.microscaler.io";

const LABEL_VALUE: &str = "true";

pub fn uuid_label(id: Uuid) -> String {
    format!("{UUID_LABEL_PREFIX}/{id}")
}

pub fn buildarch_label(arch: BuildArch) -> String {
    format!("{BUILDARCH_LABEL_PREFIX}/{arch}")
}

pub fn default_label(arch: BuildArch) -> String {
    format!("{DEFAULT_LABEL_PREFIX}/{arch}")
}

pub fn content_id_label(id: Uuid) -> String {
    format!("{CONTENT_ID_LABEL_PREFIX}/{id}")
}

/// Labels an Assignment should carry for its spec
pub fn assignment_labels(spec: &AssignmentSpec) -> BTreeMap<String, String> {
    let selectors = &spec.subject_selectors;
    let mut labels = BTreeMap::new();
    if spec.is_default {
        for arch in &selectors.buildarch {
            labels.insert(default_label(*arch), LABEL_VALUE.to_string());
        }
        return labels;
    }
    for arch in selectors.machine_archs() {
        labels.insert(buildarch_label(*arch), LABEL_VALUE.to_string());
    }
    for id in &selectors.uuid_list {
        labels.insert(uuid_label(*id), LABEL_VALUE.to_string());
    }
    labels
}

/// Labels a Profile should carry for its status
pub fn profile_labels(status: &ProfileStatus) -> BTreeMap<String, String> {
    status
        .exposed_additional_content
        .values()
        .map(|id| (content_id_label(*id), LABEL_VALUE.to_string()))
        .collect()
}

/// Label selector matching assignments for one machine
pub fn selector_for_machine(id: Uuid, arch: BuildArch) -> String {
    format!("{}={LABEL_VALUE},{}={LABEL_VALUE}", uuid_label(id), buildarch_label(arch))
}

/// Label selector matching the default assignment for an architecture
pub fn selector_for_default(arch: BuildArch) -> String {
    format!("{}={LABEL_VALUE}", default_label(arch))
}

/// Label selector matching profiles exposing a content ID
pub fn selector_for_content_id(id: Uuid) -> String {
    format!("{}={LABEL_VALUE}", content_id_label(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::SubjectSelectors;

    #[test]
    fn test_assignment_labels_for_uuid_selectors() {
        let id = Uuid::parse_str("4c4c4544-0042-3010-8051-b4c04f4b4e32").expect("valid uuid");
        let spec = AssignmentSpec {
            subject_selectors: SubjectSelectors {
                buildarch: vec![BuildArch::X86_64],
                uuid_list: vec![id],
            },
            profile_name: "worker".to_string(),
            is_default: false,
        };
        let labels = assignment_labels(&spec);
        assert_eq!(labels.len(), 2);
        assert!(labels.contains_key("uuid.dcops.microscaler.io/4c4c4544-0042-3010-8051-b4c04f4b4e32"));
        assert!(labels.contains_key("buildarch.dcops.microscaler.io/x86_64"));
    }

    #[test]
    fn test_uuid_only_assignment_is_labelled_for_every_arch() {
        let id = Uuid::new_v4();
        let spec = AssignmentSpec {
            subject_selectors: SubjectSelectors {
                buildarch: vec![],
                uuid_list: vec![id],
            },
            profile_name: "worker".to_string(),
            is_default: false,
        };
        let labels = assignment_labels(&spec);
        assert_eq!(labels.len(), 1 + BuildArch::ALL.len());
        for arch in BuildArch::ALL {
            let selector = selector_for_machine(id, arch);
            assert!(
                selector
                    .split(',')
                    .all(|term| term.split_once('=').is_some_and(|(k, v)| labels.get(k).map(String::as_str) == Some(v))),
                "{selector}"
            );
        }
    }

    #[test]
    fn test_assignment_labels_for_default() {
        let spec = AssignmentSpec {
            subject_selectors: SubjectSelectors {
                buildarch: vec![BuildArch::Arm64, BuildArch::X86_64],
                uuid_list: vec![],
            },
            profile_name: "discovery".to_string(),
            is_default: true,
        };
        let labels = assignment_labels(&spec);
        assert_eq!(
            labels.keys().cloned().collect::<Vec<_>>(),
            vec![
                "default.dcops.microscaler.io/arm64".to_string(),
                "default.dcops.microscaler.io/x86_64".to_string(),
            ]
        );
    }

    #[test]
    fn test_profile_labels_follow_status() {
        let id = Uuid::new_v4();
        let mut status = ProfileStatus::default();
        status.exposed_additional_content.insert("cfg".to_string(), id);
        let labels = profile_labels(&status);
        assert_eq!(labels.get(&content_id_label(id)).map(String::as_str), Some("true"));
    }

    #[test]
    fn test_machine_selector_matches_generated_labels() {
        let id = Uuid::new_v4();
        let selector = selector_for_machine(id, BuildArch::I386);
        assert_eq!(
            selector,
            format!("uuid.dcops.microscaler.io/{id}=true,buildarch.dcops.microscaler.io/i386=true")
        );
    }
}
