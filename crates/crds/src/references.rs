//! Kubernetes object references used by boot content sources
//!
//! Content items and webhook credentials point at arbitrary Kubernetes objects
//! (ConfigMaps, Secrets, custom resources) by group/version/resource coordinates
//! plus a path query selecting the field(s) to extract.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to one Kubernetes object, optionally narrowed to a single field.
///
/// `resource` is the plural resource name (e.g. `secrets`, `configmaps`), not the kind.
/// `group` is empty for the core API group.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    /// API group of the referenced resource ("" for core)
    #[serde(default)]
    pub group: String,

    /// API version of the referenced resource (e.g. "v1")
    pub version: String,

    /// Plural resource name (e.g. "secrets")
    pub resource: String,

    /// Namespace of the referenced object
    pub namespace: String,

    /// Name of the referenced object
    pub name: String,

    /// Path query selecting the field to extract (e.g. `{.data.config}`)
    ///
    /// Absent when the reference only locates credential material whose fields
    /// are selected by the enclosing type.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "jsonpath")]
    #[schemars(rename = "jsonpath")]
    pub path_query: Option<String>,
}

impl ObjectRef {
    /// Create a reference without a path query
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
            namespace: namespace.into(),
            name: name.into(),
            path_query: None,
        }
    }

    /// Helper to reference a core `v1` Secret
    pub fn secret(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new("", "v1", "secrets", namespace, name)
    }

    /// Helper to reference a core `v1` ConfigMap
    pub fn config_map(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new("", "v1", "configmaps", namespace, name)
    }

    /// Set the path query
    #[must_use]
    pub fn with_path_query(mut self, query: impl Into<String>) -> Self {
        self.path_query = Some(query.into());
        self
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// True when this points at a core `v1` Secret
    pub fn is_core_secret(&self) -> bool {
        self.group.is_empty() && self.resource == "secrets"
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}/{}", self.api_version(), self.resource, self.namespace, self.name)
    }
}

/// Location of mTLS client material (key, certificate, CA bundle) in one object
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MtlsRef {
    /// Object holding the credential material
    #[serde(flatten)]
    pub object_ref: ObjectRef,

    /// Path query to the PEM-encoded client private key
    #[serde(rename = "clientKeyJSONPath")]
    #[schemars(rename = "clientKeyJSONPath")]
    pub client_key_path: String,

    /// Path query to the PEM-encoded client certificate
    #[serde(rename = "clientCertJSONPath")]
    #[schemars(rename = "clientCertJSONPath")]
    pub client_cert_path: String,

    /// Path query to the PEM-encoded CA bundle trusted for the server
    #[serde(rename = "caBundleJSONPath")]
    #[schemars(rename = "caBundleJSONPath")]
    pub ca_bundle_path: String,

    /// Accept any server certificate
    #[serde(default)]
    pub skip_verify: bool,
}

/// Location of HTTP basic auth credentials in one object
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BasicAuthRef {
    /// Object holding the credentials
    #[serde(flatten)]
    pub object_ref: ObjectRef,

    /// Path query to the username
    #[serde(rename = "usernameJSONPath")]
    #[schemars(rename = "usernameJSONPath")]
    pub username_path: String,

    /// Path query to the password
    #[serde(rename = "passwordJSONPath")]
    #[schemars(rename = "passwordJSONPath")]
    pub password_path: String,
}

/// Remote endpoint used by webhook resolvers and transformers
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Endpoint URL
    pub url: String,

    /// Optional client certificate and private trust root
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "mtlsObjectRef")]
    #[schemars(rename = "mtlsObjectRef")]
    pub mtls_ref: Option<MtlsRef>,

    /// Optional HTTP basic auth credentials
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "basicAuthObjectRef")]
    #[schemars(rename = "basicAuthObjectRef")]
    pub basic_auth_ref: Option<BasicAuthRef>,
}

impl WebhookConfig {
    /// Webhook without credentials
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mtls_ref: None,
            basic_auth_ref: None,
        }
    }
}
