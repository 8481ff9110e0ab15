//! Fetches content from a remote endpoint

use super::{kind_mismatch, ObjectRefResolver, Resolver};
use crate::error::EngineError;
use crate::types::{ContentItem, ContentSource, ResolverKind, Selector};
use crate::webhook::{read_body, WebhookCaller, WebhookOptions};
use reqwest::Method;
use tracing::debug;

/// GETs `<url>?buildarch=<arch>&uuid=<uuid>` and returns the body
#[derive(Clone)]
pub struct WebhookResolver {
    caller: WebhookCaller,
}

impl WebhookResolver {
    pub fn new(object_refs: ObjectRefResolver, options: WebhookOptions) -> Self {
        Self {
            caller: WebhookCaller::new(object_refs, options),
        }
    }
}

#[async_trait::async_trait]
impl Resolver for WebhookResolver {
    async fn resolve(&self, content: &ContentItem, selector: &Selector) -> Result<Vec<u8>, EngineError> {
        let ContentSource::Webhook(config) = &content.source else {
            return Err(kind_mismatch(ResolverKind::Webhook, content));
        };

        let uuid = selector.uuid.to_string();
        let request = self
            .caller
            .request(Method::GET, config)
            .await?
            .query(&[("buildarch", selector.build_arch.as_str()), ("uuid", uuid.as_str())]);

        debug!(url = %config.url, content = %content.name, "Resolving content via webhook");
        let wrap = |source| EngineError::WebhookResolve {
            url: config.url.clone(),
            source,
        };
        let response = request.send().await.map_err(wrap)?;
        read_body(response).await.map_err(wrap)
    }
}
