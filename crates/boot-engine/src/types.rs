//! Domain types read by the engine
//!
//! These are validated, read-only snapshots of the `Profile` and `Assignment`
//! records. Conversion from the CRD types enforces the invariants the CRD
//! schema cannot express (exactly one content source, exposed items carry a
//! UUID, webhook transformers carry a webhook config).

use crate::error::StoreError;
use crds::{BuildArch, ObjectRef, TransformerKind, WebhookConfig};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

/// Identifies a requesting machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selector {
    pub uuid: Uuid,
    pub build_arch: BuildArch,
}

impl Selector {
    pub fn new(uuid: Uuid, build_arch: BuildArch) -> Self {
        Self { uuid, build_arch }
    }

    /// Same architecture, different UUID
    #[must_use]
    pub fn with_uuid(self, uuid: Uuid) -> Self {
        Self { uuid, ..self }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uuid={} buildarch={}", self.uuid, self.build_arch)
    }
}

/// Content source kinds, one resolver each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverKind {
    /// Literal content stored on the profile
    Inline,
    /// A field of another cluster object
    ObjectRef,
    /// Body of a remote GET
    Webhook,
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::Inline => f.write_str("Inline"),
            ResolverKind::ObjectRef => f.write_str("ObjectRef"),
            ResolverKind::Webhook => f.write_str("Webhook"),
        }
    }
}

/// Where a content item's raw bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Content given verbatim
    Inline(String),
    /// Field selected by the reference's path query
    ObjectRef(ObjectRef),
    /// Endpoint called with the machine's selector
    Webhook(WebhookConfig),
}

impl ContentSource {
    pub fn kind(&self) -> ResolverKind {
        match self {
            ContentSource::Inline(_) => ResolverKind::Inline,
            ContentSource::ObjectRef(_) => ResolverKind::ObjectRef,
            ContentSource::Webhook(_) => ResolverKind::Webhook,
        }
    }
}

/// One post-processing step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformation {
    /// Local Butane YAML to Ignition JSON conversion
    ButaneToIgnition,
    /// Remote transform endpoint
    Webhook(WebhookConfig),
}

impl Transformation {
    pub fn kind(&self) -> TransformerKind {
        match self {
            Transformation::ButaneToIgnition => TransformerKind::ButaneToIgnition,
            Transformation::Webhook(_) => TransformerKind::Webhook,
        }
    }
}

/// One piece of auxiliary profile content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub name: String,
    /// Set iff the item is exposed
    pub exposed_uuid: Option<Uuid>,
    pub source: ContentSource,
    pub post_transformers: Vec<Transformation>,
}

impl ContentItem {
    /// Unexposed item without transformers
    pub fn new(name: impl Into<String>, source: ContentSource) -> Self {
        Self {
            name: name.into(),
            exposed_uuid: None,
            source,
            post_transformers: Vec::new(),
        }
    }

    pub fn inline(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, ContentSource::Inline(content.into()))
    }

    #[must_use]
    pub fn exposed(mut self, id: Uuid) -> Self {
        self.exposed_uuid = Some(id);
        self
    }

    #[must_use]
    pub fn with_transformer(mut self, transformation: Transformation) -> Self {
        self.post_transformers.push(transformation);
        self
    }

    pub fn is_exposed(&self) -> bool {
        self.exposed_uuid.is_some()
    }

    pub fn resolver_kind(&self) -> ResolverKind {
        self.source.kind()
    }
}

/// Boot template plus its auxiliary content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub namespace: String,
    pub boot_template: String,
    pub additional_content: BTreeMap<String, ContentItem>,
    /// Derived from `additional_content[*].exposed_uuid`
    pub content_id_to_name: HashMap<Uuid, String>,
}

impl Profile {
    /// Build a profile, deriving the content ID index from the items
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        boot_template: impl Into<String>,
        items: impl IntoIterator<Item = ContentItem>,
    ) -> Result<Self, StoreError> {
        let name = name.into();
        let mut additional_content = BTreeMap::new();
        let mut content_id_to_name = HashMap::new();
        for item in items {
            if let Some(id) = item.exposed_uuid {
                if content_id_to_name.insert(id, item.name.clone()).is_some() {
                    return Err(invalid(&name, format!("content ID {id} is used twice")));
                }
            }
            let item_name = item.name.clone();
            if additional_content.insert(item_name.clone(), item).is_some() {
                return Err(invalid(&name, format!("content name {item_name:?} is used twice")));
            }
        }
        Ok(Self {
            name,
            namespace: namespace.into(),
            boot_template: boot_template.into(),
            additional_content,
            content_id_to_name,
        })
    }

    /// Item exposed under `id`, if any
    pub fn content_by_id(&self, id: Uuid) -> Option<&ContentItem> {
        self.content_id_to_name
            .get(&id)
            .and_then(|name| self.additional_content.get(name))
    }

    /// Validate and convert a `Profile` custom resource
    pub fn from_resource(resource: &crds::Profile) -> Result<Self, StoreError> {
        let name = resource.metadata.name.clone().unwrap_or_default();
        let namespace = resource.metadata.namespace.clone().unwrap_or_default();
        let exposed_ids = resource
            .status
            .as_ref()
            .map(|s| &s.exposed_additional_content);

        let mut items = Vec::with_capacity(resource.spec.additional_content.len());
        for content in &resource.spec.additional_content {
            let source = content_source(&name, content)?;
            let exposed_uuid = match (content.exposed, exposed_ids.and_then(|ids| ids.get(&content.name))) {
                (true, Some(id)) if !id.is_nil() => Some(*id),
                (true, _) => {
                    return Err(invalid(
                        &name,
                        format!("content {:?} is exposed but has no UUID assigned yet", content.name),
                    ));
                }
                (false, _) => None,
            };
            let post_transformers = content
                .post_transformations
                .iter()
                .map(|t| transformation(&name, &content.name, t))
                .collect::<Result<Vec<_>, _>>()?;
            items.push(ContentItem {
                name: content.name.clone(),
                exposed_uuid,
                source,
                post_transformers,
            });
        }

        Profile::new(name, namespace, resource.spec.ipxe_template.clone(), items)
    }
}

fn content_source(profile: &str, content: &crds::AdditionalContent) -> Result<ContentSource, StoreError> {
    match (&content.inline, &content.object_ref, &content.webhook) {
        (Some(text), None, None) => Ok(ContentSource::Inline(text.clone())),
        (None, Some(r), None) => Ok(ContentSource::ObjectRef(r.clone())),
        (None, None, Some(w)) => Ok(ContentSource::Webhook(w.clone())),
        _ => Err(invalid(
            profile,
            format!("content {:?} must set exactly one of inline, objectRef, webhook", content.name),
        )),
    }
}

fn transformation(
    profile: &str,
    content: &str,
    config: &crds::TransformerConfig,
) -> Result<Transformation, StoreError> {
    match (config.kind, &config.webhook) {
        (TransformerKind::ButaneToIgnition, None) => Ok(Transformation::ButaneToIgnition),
        (TransformerKind::Webhook, Some(w)) => Ok(Transformation::Webhook(w.clone())),
        (kind, _) => Err(invalid(
            profile,
            format!("content {content:?}: transformer {kind} must set webhook iff kind is Webhook"),
        )),
    }
}

fn invalid(name: &str, reason: String) -> StoreError {
    StoreError::InvalidRecord {
        name: name.to_string(),
        reason,
    }
}

/// Rule binding a selector pattern to a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub namespace: String,
    pub profile_name: String,
    pub subject_selectors: crds::SubjectSelectors,
    pub is_default: bool,
}

impl Assignment {
    pub fn from_resource(resource: &crds::Assignment) -> Result<Self, StoreError> {
        let name = resource.metadata.name.clone().unwrap_or_default();
        let spec = &resource.spec;
        if spec.is_default && !spec.subject_selectors.uuid_list.is_empty() {
            return Err(invalid(&name, "default assignments cannot select UUIDs".to_string()));
        }
        Ok(Self {
            name,
            namespace: resource.metadata.namespace.clone().unwrap_or_default(),
            profile_name: spec.profile_name.clone(),
            subject_selectors: spec.subject_selectors.clone(),
            is_default: spec.is_default,
        })
    }
}
