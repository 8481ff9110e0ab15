//! Resolves content by extracting fields from another object

use super::{kind_mismatch, Resolver};
use crate::error::EngineError;
use crate::path_query;
use crate::store::ObjectStore;
use crate::types::{ContentItem, ContentSource, ResolverKind, Selector};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crds::ObjectRef;
use std::sync::Arc;
use tracing::debug;

/// Fetches one object and runs path queries against it
#[derive(Clone)]
pub struct ObjectRefResolver {
    store: Arc<dyn ObjectStore>,
}

impl ObjectRefResolver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fetch `reference` once and extract every path from it.
    ///
    /// The result has one entry per path, in the same order as `paths`;
    /// callers index it positionally.
    pub async fn resolve_paths(
        &self,
        paths: &[&str],
        reference: &ObjectRef,
    ) -> Result<Vec<Vec<u8>>, EngineError> {
        let document = self
            .store
            .get_object(reference.into())
            .await
            .map_err(|e| EngineError::object_ref(reference, e.to_string()))?;

        debug!(object = %reference, paths = paths.len(), "Extracting fields");
        paths
            .iter()
            .map(|path| extract_field(&document, path, reference))
            .collect()
    }
}

fn extract_field(
    document: &serde_json::Value,
    query: &str,
    reference: &ObjectRef,
) -> Result<Vec<u8>, EngineError> {
    let normalized = path_query::normalize(query);
    let bytes = path_query::extract(document, &normalized)
        .map_err(|e| EngineError::object_ref(reference, format!("{query}: {e}")))?;

    // Secret data is stored base64-encoded
    if reference.is_core_secret() && path_query::targets_data_map(&normalized) {
        return STANDARD
            .decode(&bytes)
            .map_err(|e| EngineError::object_ref(reference, format!("{query}: invalid base64 secret data: {e}")));
    }
    Ok(bytes)
}

#[async_trait::async_trait]
impl Resolver for ObjectRefResolver {
    async fn resolve(&self, content: &ContentItem, _selector: &Selector) -> Result<Vec<u8>, EngineError> {
        let ContentSource::ObjectRef(reference) = &content.source else {
            return Err(kind_mismatch(ResolverKind::ObjectRef, content));
        };
        let Some(query) = reference.path_query.as_deref() else {
            return Err(EngineError::object_ref(reference, "no path query set"));
        };
        let mut results = self.resolve_paths(&[query], reference).await?;
        results
            .pop()
            .ok_or_else(|| EngineError::object_ref(reference, format!("{query}: path query matched nothing")))
    }
}
