//! Transformers: post-processing steps applied after resolution

mod butane;
mod webhook;

pub use butane::ButaneToIgnition;
pub use webhook::WebhookTransformer;

use crate::error::EngineError;
use crate::types::{Selector, Transformation};

/// Rewrites a resolved payload
#[async_trait::async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(
        &self,
        config: &Transformation,
        payload: Vec<u8>,
        selector: &Selector,
    ) -> Result<Vec<u8>, EngineError>;
}
