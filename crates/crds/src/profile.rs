//! Profile CRD
//!
//! Defines an iPXE boot template plus the auxiliary content (cloud-init,
//! ignition, secrets-derived files) the template can reference.

use crate::references::{ObjectRef, WebhookConfig};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "dcops.microscaler.io",
    version = "v1alpha1",
    kind = "Profile",
    namespaced,
    status = "ProfileStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSpec {
    /// iPXE script template rendered with the resolved additional content
    pub ipxe_template: String,

    /// Auxiliary content, names unique within the profile
    #[serde(default)]
    pub additional_content: Vec<AdditionalContent>,
}

/// One piece of auxiliary profile content
///
/// Exactly one of `inline`, `objectRef` or `webhook` must be set. This struct
/// uses optional fields instead of an enum to keep the CRD schema structural.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalContent {
    /// Name used as the template variable
    pub name: String,

    /// Serve this content by stable UUID instead of inlining it
    #[serde(default)]
    pub exposed: bool,

    /// Transformations applied in order after resolution
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_transformations: Vec<TransformerConfig>,

    /// Literal content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<String>,

    /// Content extracted from another Kubernetes object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_ref: Option<ObjectRef>,

    /// Content fetched from a remote webhook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
}

/// Post-processing step
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransformerConfig {
    pub kind: TransformerKind,

    /// Required when `kind` is `Webhook`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum TransformerKind {
    /// Butane YAML to Ignition JSON
    ButaneToIgnition,
    /// Remote transformation over HTTP
    Webhook,
}

impl std::fmt::Display for TransformerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformerKind::ButaneToIgnition => f.write_str("ButaneToIgnition"),
            TransformerKind::Webhook => f.write_str("Webhook"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatus {
    /// Stable UUID assigned to each exposed content item (content name -> UUID)
    #[serde(default)]
    pub exposed_additional_content: BTreeMap<String, Uuid>,

    /// Last reconciliation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,
}
