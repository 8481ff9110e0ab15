//! Profile selection and boot script rendering
//!
//! A request is served in five steps:
//!
//! 1. find an assignment matching the machine's UUID and architecture
//! 2. if (and only if) none exists, fall back to the architecture default
//! 3. load the assignment's profile
//! 4. resolve the profile's content, exposed items as reference URLs
//! 5. render the profile's boot template with the content map as variables
//!
//! Items are bound by name, and `content("user-data")` reaches any item
//! whose name is not a template identifier. An item named `content` shadows
//! that function.
//!
//! Any failure other than the not-found in step 1 ends the request.

use crate::error::EngineError;
use crate::mux::{BatchMode, Multiplexer};
use crate::store::BootRecordStore;
use crate::types::{Assignment, Selector};
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Which lookup produced the assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Uuid,
    Default,
}

impl fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchedBy::Uuid => f.write_str("uuid"),
            MatchedBy::Default => f.write_str("default"),
        }
    }
}

/// Selects a profile for a machine and renders its boot script
pub struct IpxeEngine {
    records: Arc<dyn BootRecordStore>,
    mux: Arc<Multiplexer>,
    templates: Environment<'static>,
    bootstrap: OnceLock<Vec<u8>>,
}

impl fmt::Debug for IpxeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpxeEngine")
            .field("mux", &self.mux)
            .field("bootstrap_cached", &self.bootstrap.get().is_some())
            .finish_non_exhaustive()
    }
}

fn template_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_keep_trailing_newline(true);
    env
}

/// Template function looking up a content item by name
fn content_accessor(content: Arc<BTreeMap<String, String>>) -> Value {
    Value::from_function(move |name: String| -> Result<String, minijinja::Error> {
        content.get(&name).cloned().ok_or_else(|| {
            minijinja::Error::new(ErrorKind::UndefinedError, format!("no content item named {name:?}"))
        })
    })
}

impl IpxeEngine {
    pub fn new(records: Arc<dyn BootRecordStore>, mux: Arc<Multiplexer>) -> Self {
        Self {
            records,
            mux,
            templates: template_environment(),
            bootstrap: OnceLock::new(),
        }
    }

    /// Exact match first, architecture default only when the exact lookup found nothing
    pub async fn select_assignment(&self, selector: &Selector) -> Result<(Assignment, MatchedBy), EngineError> {
        let (assignment, matched_by) = match self.records.find_assignment_by_selector(selector).await {
            Ok(assignment) => (assignment, MatchedBy::Uuid),
            Err(e) if e.is_not_found() => {
                debug!(%selector, "No assignment for machine, trying architecture default");
                let assignment = self
                    .records
                    .find_default_assignment(selector.build_arch)
                    .await
                    .map_err(|source| EngineError::ProfileSelection {
                        selector: *selector,
                        source,
                    })?;
                (assignment, MatchedBy::Default)
            }
            Err(source) => {
                return Err(EngineError::ProfileSelection {
                    selector: *selector,
                    source,
                });
            }
        };

        info!(
            matched_by = %matched_by,
            uuid = %selector.uuid,
            buildarch = %selector.build_arch,
            assignment = %assignment.name,
            profile = %assignment.profile_name,
            "Selected assignment"
        );
        Ok((assignment, matched_by))
    }

    /// Render the boot script for `selector`
    pub async fn find_profile_and_render(&self, selector: &Selector) -> Result<Vec<u8>, EngineError> {
        let (assignment, _) = self.select_assignment(selector).await?;

        let profile = self
            .records
            .get_profile(&assignment.profile_name)
            .await
            .map_err(|source| EngineError::ProfileLookup {
                name: assignment.profile_name.clone(),
                source,
            })?;
        info!(
            profile = %profile.name,
            namespace = %profile.namespace,
            uuid = %selector.uuid,
            buildarch = %selector.build_arch,
            "Matched profile"
        );

        let content = self
            .mux
            .resolve_and_transform_batch(&profile.additional_content, selector, BatchMode::ReturnExposedUrl)
            .await?;
        let content: Arc<BTreeMap<String, String>> = Arc::new(
            content
                .into_iter()
                .map(|(name, bytes)| (name, String::from_utf8_lossy(&bytes).into_owned()))
                .collect(),
        );

        let mut variables: BTreeMap<String, Value> = content
            .iter()
            .map(|(name, text)| (name.clone(), Value::from(text.as_str())))
            .collect();
        variables
            .entry("content".to_string())
            .or_insert_with(|| content_accessor(content));

        let script = self.templates.render_str(&profile.boot_template, variables)?;
        Ok(script.into_bytes())
    }

    /// Script that chains every machine into the selection endpoint
    ///
    /// Built once; each call gets its own copy.
    pub fn bootstrap(&self) -> Vec<u8> {
        self.bootstrap
            .get_or_init(|| {
                format!(
                    "#!ipxe\nchain {}/ipxe?uuid=${{uuid}}&buildarch=${{buildarch:uristring}}\n",
                    self.mux.base_url()
                )
                .into_bytes()
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorClass, StoreError};
    use crate::resolver::InlineResolver;
    use crate::store::mock::{MockBootStore, StoreCall};
    use crate::types::{ContentItem, Profile, ResolverKind};
    use crds::{BuildArch, SubjectSelectors};
    use uuid::Uuid;

    const BASE: &str = "http://boot.example:8080";

    fn assignment(name: &str, profile: &str, ids: Vec<Uuid>, arch: BuildArch, is_default: bool) -> Assignment {
        Assignment {
            name: name.to_string(),
            namespace: "boot".to_string(),
            profile_name: profile.to_string(),
            subject_selectors: SubjectSelectors {
                buildarch: vec![arch],
                uuid_list: ids,
            },
            is_default,
        }
    }

    fn profile(name: &str, template: &str, items: Vec<ContentItem>) -> Profile {
        Profile::new(name, "boot", template, items).expect("valid profile")
    }

    fn engine(store: &MockBootStore) -> IpxeEngine {
        let mux = Multiplexer::new(BASE).with_resolver(ResolverKind::Inline, Arc::new(InlineResolver));
        IpxeEngine::new(Arc::new(store.clone()), Arc::new(mux))
    }

    #[tokio::test]
    async fn test_exact_match_skips_fallback() {
        let machine = Uuid::new_v4();
        let store = MockBootStore::new();
        store.add_assignment(assignment("worker-a", "worker", vec![machine], BuildArch::X86_64, false));
        store.add_assignment(assignment("default-x86", "fallback", vec![], BuildArch::X86_64, true));

        let (selected, matched_by) = engine(&store)
            .select_assignment(&Selector::new(machine, BuildArch::X86_64))
            .await
            .expect("assignment should match");
        assert_eq!(matched_by, MatchedBy::Uuid);
        assert_eq!(selected.name, "worker-a");
        assert!(!store
            .calls()
            .iter()
            .any(|c| matches!(c, StoreCall::FindDefaultAssignment(_))));
    }

    #[tokio::test]
    async fn test_falls_back_to_architecture_default() {
        let store = MockBootStore::new();
        store.add_assignment(assignment("default-arm", "fallback", vec![], BuildArch::Arm64, true));

        let (selected, matched_by) = engine(&store)
            .select_assignment(&Selector::new(Uuid::new_v4(), BuildArch::Arm64))
            .await
            .expect("default should match");
        assert_eq!(matched_by, MatchedBy::Default);
        assert_eq!(selected.profile_name, "fallback");
    }

    #[tokio::test]
    async fn test_no_assignment_and_no_default() {
        let store = MockBootStore::new();
        store.add_assignment(assignment("default-x86", "fallback", vec![], BuildArch::X86_64, true));

        let err = engine(&store)
            .find_profile_and_render(&Selector::new(Uuid::new_v4(), BuildArch::Arm64))
            .await
            .expect_err("nothing matches arm64");
        assert!(matches!(err, EngineError::ProfileSelection { .. }));
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert!(!store.calls().iter().any(|c| matches!(c, StoreCall::GetProfile(_))));
    }

    /// Lookups fail with something other than not-found
    struct BrokenStore;

    #[async_trait::async_trait]
    impl BootRecordStore for BrokenStore {
        async fn get_profile(&self, _name: &str) -> Result<Profile, StoreError> {
            unreachable!("selection must fail first")
        }
        async fn find_assignment_by_selector(&self, _selector: &Selector) -> Result<Assignment, StoreError> {
            Err(StoreError::InvalidRecord {
                name: "a".to_string(),
                reason: "corrupt".to_string(),
            })
        }
        async fn find_default_assignment(&self, _build_arch: BuildArch) -> Result<Assignment, StoreError> {
            unreachable!("fallback is only for not-found")
        }
        async fn find_profiles_by_content_id(&self, _id: Uuid) -> Result<Vec<Profile>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_does_not_fall_back() {
        let engine = IpxeEngine::new(Arc::new(BrokenStore), Arc::new(Multiplexer::new(BASE)));
        let err = engine
            .select_assignment(&Selector::new(Uuid::new_v4(), BuildArch::X86_64))
            .await
            .expect_err("lookup failure is fatal");
        assert_eq!(err.class(), ErrorClass::Unavailable);
    }

    #[tokio::test]
    async fn test_render_references_exposed_content() {
        let machine = Uuid::new_v4();
        let content_id = Uuid::new_v4();
        let store = MockBootStore::new();
        store.add_assignment(assignment("worker-a", "worker", vec![machine], BuildArch::X86_64, false));
        store.add_profile(profile(
            "worker",
            "#!ipxe\nkernel /vmlinuz {{ cmdline }} ignition.config.url={{ cfg }}\nboot\n",
            vec![
                ContentItem::inline("cfg", "variant: fcos").exposed(content_id),
                ContentItem::inline("cmdline", "console=ttyS0"),
            ],
        ));

        let script = engine(&store)
            .find_profile_and_render(&Selector::new(machine, BuildArch::X86_64))
            .await
            .expect("script should render");
        let script = String::from_utf8(script).expect("script is text");
        assert_eq!(
            script,
            format!(
                "#!ipxe\nkernel /vmlinuz console=ttyS0 ignition.config.url={BASE}/content/{content_id}\nboot\n"
            )
        );
    }

    #[tokio::test]
    async fn test_render_keeps_ipxe_variables() {
        let store = MockBootStore::new();
        store.add_assignment(assignment("default", "p", vec![], BuildArch::X86_64, true));
        store.add_profile(profile("p", "#!ipxe\necho ${net0/mac} <&>\n", vec![]));

        let script = engine(&store)
            .find_profile_and_render(&Selector::new(Uuid::new_v4(), BuildArch::X86_64))
            .await
            .expect("script should render");
        assert_eq!(script, b"#!ipxe\necho ${net0/mac} <&>\n");
    }

    #[tokio::test]
    async fn test_render_missing_variable_is_template_failure() {
        let store = MockBootStore::new();
        store.add_assignment(assignment("default", "p", vec![], BuildArch::X86_64, true));
        store.add_profile(profile("p", "#!ipxe\nchain {{ missing }}\n", vec![]));

        let err = engine(&store)
            .find_profile_and_render(&Selector::new(Uuid::new_v4(), BuildArch::X86_64))
            .await
            .expect_err("undefined variable");
        assert_eq!(err.class(), ErrorClass::TemplateFailure);
    }

    #[tokio::test]
    async fn test_render_reaches_items_by_name() {
        let store = MockBootStore::new();
        store.add_assignment(assignment("default", "p", vec![], BuildArch::X86_64, true));
        store.add_profile(profile(
            "p",
            "#!ipxe\nkernel /vmlinuz ds={{ content(\"user-data\") }} {{ cmdline }}\n",
            vec![
                ContentItem::inline("user-data", "http://seed/"),
                ContentItem::inline("cmdline", "quiet"),
            ],
        ));

        let script = engine(&store)
            .find_profile_and_render(&Selector::new(Uuid::new_v4(), BuildArch::X86_64))
            .await
            .expect("script should render");
        assert_eq!(script, b"#!ipxe\nkernel /vmlinuz ds=http://seed/ quiet\n");
    }

    #[tokio::test]
    async fn test_render_unknown_content_name_is_template_failure() {
        let store = MockBootStore::new();
        store.add_assignment(assignment("default", "p", vec![], BuildArch::X86_64, true));
        store.add_profile(profile("p", "#!ipxe\n{{ content(\"cloud-init\") }}\n", vec![]));

        let err = engine(&store)
            .find_profile_and_render(&Selector::new(Uuid::new_v4(), BuildArch::X86_64))
            .await
            .expect_err("no such item");
        assert_eq!(err.class(), ErrorClass::TemplateFailure);
    }

    #[tokio::test]
    async fn test_uuid_only_assignment_selects_any_arch() {
        let machine = Uuid::new_v4();
        let store = MockBootStore::new();
        let mut worker = assignment("worker-a", "worker", vec![machine], BuildArch::X86_64, false);
        worker.subject_selectors.buildarch.clear();
        store.add_assignment(worker);
        store.add_assignment(assignment("default-arm", "fallback", vec![], BuildArch::Arm64, true));

        let (selected, matched_by) = engine(&store)
            .select_assignment(&Selector::new(machine, BuildArch::Arm64))
            .await
            .expect("assignment should match");
        assert_eq!(matched_by, MatchedBy::Uuid);
        assert_eq!(selected.name, "worker-a");
    }

    #[tokio::test]
    async fn test_render_missing_profile() {
        let store = MockBootStore::new();
        store.add_assignment(assignment("default", "gone", vec![], BuildArch::I386, true));

        let err = engine(&store)
            .find_profile_and_render(&Selector::new(Uuid::new_v4(), BuildArch::I386))
            .await
            .expect_err("profile does not exist");
        assert!(matches!(err, EngineError::ProfileLookup { ref name, .. } if name == "gone"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_bootstrap_returns_independent_copies() {
        let engine = engine(&MockBootStore::new());
        let mut first = engine.bootstrap();
        let second = engine.bootstrap();
        assert_eq!(first, second);
        assert_eq!(
            String::from_utf8_lossy(&second),
            format!("#!ipxe\nchain {BASE}/ipxe?uuid=${{uuid}}&buildarch=${{buildarch:uristring}}\n")
        );

        first.clear();
        assert_eq!(engine.bootstrap(), second);
    }
}
