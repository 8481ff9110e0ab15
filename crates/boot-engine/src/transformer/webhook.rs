//! Remote transformation over HTTP

use super::Transformer;
use crate::error::EngineError;
use crate::resolver::ObjectRefResolver;
use crate::types::{Selector, Transformation};
use crate::webhook::{read_body, WebhookCaller, WebhookOptions};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct TransformRequest<'a> {
    /// Payload, base64-encoded
    content: String,
    attributes: Attributes<'a>,
}

#[derive(Debug, Serialize)]
struct Attributes<'a> {
    uuid: String,
    buildarch: &'a str,
}

/// POSTs the payload and request attributes, returns the response body
#[derive(Clone)]
pub struct WebhookTransformer {
    caller: WebhookCaller,
}

impl WebhookTransformer {
    pub fn new(object_refs: ObjectRefResolver, options: WebhookOptions) -> Self {
        Self {
            caller: WebhookCaller::new(object_refs, options),
        }
    }
}

#[async_trait::async_trait]
impl Transformer for WebhookTransformer {
    async fn transform(
        &self,
        config: &Transformation,
        payload: Vec<u8>,
        selector: &Selector,
    ) -> Result<Vec<u8>, EngineError> {
        let Transformation::Webhook(webhook) = config else {
            return Err(EngineError::Transform(format!(
                "Webhook transformer cannot apply {} transformation",
                config.kind()
            )));
        };

        let uuid = selector.uuid.to_string();
        let arch = selector.build_arch.as_str();
        let body = TransformRequest {
            content: STANDARD.encode(&payload),
            attributes: Attributes {
                uuid: uuid.clone(),
                buildarch: arch,
            },
        };
        let request = self
            .caller
            .request(Method::POST, webhook)
            .await?
            .query(&[("uuid", uuid.as_str()), ("buildarch", arch)])
            .json(&body);

        debug!(url = %webhook.url, bytes = payload.len(), "Transforming content via webhook");
        let wrap = |source| EngineError::WebhookTransform {
            url: webhook.url.clone(),
            source,
        };
        let response = request.send().await.map_err(wrap)?;
        read_body(response).await.map_err(wrap)
    }
}
