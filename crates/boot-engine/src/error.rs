//! Boot engine errors

use crate::types::{ResolverKind, Selector};
use crds::TransformerKind;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by the object store and boot record collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Record exists but violates a schema invariant
    #[error("Invalid record {name}: {reason}")]
    InvalidRecord { name: String, reason: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Not-found is the one store failure callers are allowed to branch on
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Coarse error taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Assignment, profile or content item does not exist
    NotFound,
    /// Resolver/transformer kind not registered
    UnknownKind,
    /// Network, object store or credential failure while resolving
    ResolutionFailure,
    /// Conversion or remote transform failure
    TransformFailure,
    /// Malformed boot template or missing variable
    TemplateFailure,
    /// Rejected request parameters
    InvalidInput,
    /// A collaborator failed for a reason other than not-found
    Unavailable,
}

/// Pipeline stage an item-level failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching the raw bytes
    Resolve(ResolverKind),
    /// Applying the `index`th post-transformer
    Transform { index: usize, kind: TransformerKind },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve(kind) => write!(f, "resolve via {kind}"),
            Stage::Transform { index, kind } => write!(f, "transform #{index} ({kind})"),
        }
    }
}

/// Errors produced by the resolution pipeline and the engines built on it
#[derive(Debug, Error)]
pub enum EngineError {
    /// Neither an exact nor a default assignment could be found
    #[error("No profile selected for {selector}: {source}")]
    ProfileSelection {
        selector: Selector,
        #[source]
        source: StoreError,
    },

    /// The assignment's profile could not be loaded
    #[error("Profile {name} could not be loaded: {source}")]
    ProfileLookup {
        name: String,
        #[source]
        source: StoreError,
    },

    /// No profile exposes this content ID
    #[error("Content {0} not found")]
    ContentNotFound(Uuid),

    /// Content ID was the nil UUID
    #[error("Invalid content ID: {0}")]
    InvalidId(Uuid),

    /// The multiplexer has no resolver for the item's source kind
    #[error("No resolver registered for kind {0}")]
    UnknownResolver(ResolverKind),

    /// The multiplexer has no transformer for a requested transformation
    #[error("No transformer registered for kind {0}")]
    UnknownTransformer(TransformerKind),

    /// Object missing, unreadable, or path query matched nothing
    #[error("Failed to resolve object {reference}: {reason}")]
    ObjectRefResolution { reference: String, reason: String },

    /// Resolver-side failure without a more specific variant
    #[error("Resolution failed: {0}")]
    Resolution(String),

    /// Network-level failure calling a resolver webhook
    #[error("Webhook GET {url} failed: {source}")]
    WebhookResolve {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Conversion failure
    #[error("Transform failed: {0}")]
    Transform(String),

    /// Network-level failure calling a transformer webhook
    #[error("Webhook POST {url} failed: {source}")]
    WebhookTransform {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Failure of one content item, with its name and stage
    #[error("Content {name} failed to {stage}: {source}")]
    Content {
        name: String,
        stage: Stage,
        #[source]
        source: Box<EngineError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Map this error onto the caller-facing taxonomy
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::ProfileSelection { source, .. }
            | EngineError::ProfileLookup { source, .. }
            | EngineError::Store(source) => {
                if source.is_not_found() {
                    ErrorClass::NotFound
                } else {
                    ErrorClass::Unavailable
                }
            }
            EngineError::ContentNotFound(_) => ErrorClass::NotFound,
            EngineError::InvalidId(_) => ErrorClass::InvalidInput,
            EngineError::UnknownResolver(_) | EngineError::UnknownTransformer(_) => {
                ErrorClass::UnknownKind
            }
            EngineError::ObjectRefResolution { .. }
            | EngineError::Resolution(_)
            | EngineError::WebhookResolve { .. } => ErrorClass::ResolutionFailure,
            EngineError::Transform(_) | EngineError::WebhookTransform { .. } => {
                ErrorClass::TransformFailure
            }
            EngineError::Template(_) => ErrorClass::TemplateFailure,
            EngineError::Content { source, .. } => source.class(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }

    /// Wrap an item-level failure with its content name and stage
    pub(crate) fn in_content(self, name: &str, stage: Stage) -> Self {
        EngineError::Content {
            name: name.to_string(),
            stage,
            source: Box::new(self),
        }
    }

    pub(crate) fn object_ref(reference: impl fmt::Display, reason: impl Into<String>) -> Self {
        EngineError::ObjectRefResolution {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_error_inherits_class() {
        let err = EngineError::Transform("bad yaml".to_string()).in_content(
            "cfg",
            Stage::Transform {
                index: 0,
                kind: TransformerKind::ButaneToIgnition,
            },
        );
        assert_eq!(err.class(), ErrorClass::TransformFailure);
        assert_eq!(
            err.to_string(),
            "Content cfg failed to transform #0 (ButaneToIgnition): Transform failed: bad yaml"
        );
    }

    #[test]
    fn test_profile_selection_class_follows_source() {
        let selector = Selector::new(Uuid::nil(), crds::BuildArch::Arm64);
        let not_found = EngineError::ProfileSelection {
            selector,
            source: StoreError::NotFound("default assignment for arm64".to_string()),
        };
        assert!(not_found.is_not_found());

        let broken = EngineError::ProfileSelection {
            selector,
            source: StoreError::InvalidRecord {
                name: "a".to_string(),
                reason: "bad".to_string(),
            },
        };
        assert_eq!(broken.class(), ErrorClass::Unavailable);
    }

    #[test]
    fn test_unknown_kind_class() {
        assert_eq!(
            EngineError::UnknownResolver(ResolverKind::Webhook).class(),
            ErrorClass::UnknownKind
        );
    }
}
