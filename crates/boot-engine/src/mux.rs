//! Resolve/transform multiplexer
//!
//! Dispatches a content item to the resolver registered for its source kind,
//! then threads the output through its transformer chain in order. Kinds are
//! looked up in a registry; an unregistered kind is an error, never a no-op.

use crate::error::{EngineError, Stage};
use crate::resolver::{InlineResolver, ObjectRefResolver, Resolver, WebhookResolver};
use crate::store::ObjectStore;
use crate::transformer::{ButaneToIgnition, Transformer, WebhookTransformer};
use crate::types::{ContentItem, ResolverKind, Selector};
use crate::webhook::WebhookOptions;
use crds::TransformerKind;
use futures::future::try_join_all;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// How a batch treats exposed items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Exposed items become `<baseURL>/content/<id>` and are not resolved
    ReturnExposedUrl,
    /// Every item is resolved and transformed
    Materialize,
}

/// Registry of resolvers and transformers
#[derive(Clone)]
pub struct Multiplexer {
    base_url: String,
    resolvers: HashMap<ResolverKind, Arc<dyn Resolver>>,
    transformers: HashMap<TransformerKind, Arc<dyn Transformer>>,
}

impl fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("base_url", &self.base_url)
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .field("transformers", &self.transformers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Multiplexer {
    /// Empty registry; `base_url` prefixes exposed content URLs
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resolvers: HashMap::new(),
            transformers: HashMap::new(),
        }
    }

    /// Register (or replace) the resolver for `kind`
    #[must_use]
    pub fn with_resolver(mut self, kind: ResolverKind, resolver: Arc<dyn Resolver>) -> Self {
        self.resolvers.insert(kind, resolver);
        self
    }

    /// Register (or replace) the transformer for `kind`
    #[must_use]
    pub fn with_transformer(mut self, kind: TransformerKind, transformer: Arc<dyn Transformer>) -> Self {
        self.transformers.insert(kind, transformer);
        self
    }

    /// Every built-in resolver and transformer, reading objects from `store`
    pub fn standard(base_url: impl Into<String>, store: Arc<dyn ObjectStore>, options: WebhookOptions) -> Self {
        let object_refs = ObjectRefResolver::new(store);
        Self::new(base_url)
            .with_resolver(ResolverKind::Inline, Arc::new(InlineResolver))
            .with_resolver(ResolverKind::ObjectRef, Arc::new(object_refs.clone()))
            .with_resolver(
                ResolverKind::Webhook,
                Arc::new(WebhookResolver::new(object_refs.clone(), options)),
            )
            .with_transformer(TransformerKind::ButaneToIgnition, Arc::new(ButaneToIgnition))
            .with_transformer(
                TransformerKind::Webhook,
                Arc::new(WebhookTransformer::new(object_refs, options)),
            )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reference URL for an exposed content item
    pub fn exposed_url(&self, id: Uuid) -> String {
        format!("{}/content/{id}", self.base_url)
    }

    /// Resolve one item and apply its transformers in order
    pub async fn resolve_and_transform(
        &self,
        content: &ContentItem,
        selector: &Selector,
    ) -> Result<Vec<u8>, EngineError> {
        let kind = content.resolver_kind();
        let stage = Stage::Resolve(kind);
        let resolver = self
            .resolvers
            .get(&kind)
            .ok_or(EngineError::UnknownResolver(kind))
            .map_err(|e| e.in_content(&content.name, stage))?;

        debug!(content = %content.name, resolver = %kind, "Resolving content");
        let mut payload = resolver
            .resolve(content, selector)
            .await
            .map_err(|e| e.in_content(&content.name, stage))?;

        for (index, transformation) in content.post_transformers.iter().enumerate() {
            let kind = transformation.kind();
            let stage = Stage::Transform { index, kind };
            let transformer = self
                .transformers
                .get(&kind)
                .ok_or(EngineError::UnknownTransformer(kind))
                .map_err(|e| e.in_content(&content.name, stage))?;

            debug!(content = %content.name, index, transformer = %kind, "Transforming content");
            payload = transformer
                .transform(transformation, payload, selector)
                .await
                .map_err(|e| e.in_content(&content.name, stage))?;
        }
        Ok(payload)
    }

    /// Resolve every item concurrently; the first failure aborts the batch
    pub async fn resolve_and_transform_batch(
        &self,
        items: &BTreeMap<String, ContentItem>,
        selector: &Selector,
        mode: BatchMode,
    ) -> Result<BTreeMap<String, Vec<u8>>, EngineError> {
        let resolved = try_join_all(items.iter().map(|(name, item)| async move {
            let bytes = match (mode, item.exposed_uuid) {
                (BatchMode::ReturnExposedUrl, Some(id)) => self.exposed_url(id).into_bytes(),
                _ => self.resolve_and_transform(item, selector).await?,
            };
            Ok::<_, EngineError>((name.clone(), bytes))
        }))
        .await?;
        Ok(resolved.into_iter().collect())
    }
}
