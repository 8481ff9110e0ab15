//! Resolvers: one per content source kind
//!
//! A resolver turns a content item's source into raw bytes. The multiplexer
//! picks the resolver registered for `ContentItem::resolver_kind()`.

mod object_ref;
mod webhook;

pub use object_ref::ObjectRefResolver;
pub use webhook::WebhookResolver;

use crate::error::EngineError;
use crate::types::{ContentItem, ResolverKind, Selector};

/// Fetches the raw bytes of a content item
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, content: &ContentItem, selector: &Selector) -> Result<Vec<u8>, EngineError>;
}

/// Error for a content item routed to a resolver of another kind
pub(crate) fn kind_mismatch(expected: ResolverKind, content: &ContentItem) -> EngineError {
    EngineError::Resolution(format!(
        "{expected} resolver cannot resolve {} content {:?}",
        content.resolver_kind(),
        content.name
    ))
}

/// Returns the literal payload
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineResolver;

#[async_trait::async_trait]
impl Resolver for InlineResolver {
    async fn resolve(&self, content: &ContentItem, _selector: &Selector) -> Result<Vec<u8>, EngineError> {
        match &content.source {
            crate::types::ContentSource::Inline(text) => Ok(text.as_bytes().to_vec()),
            _ => Err(kind_mismatch(ResolverKind::Inline, content)),
        }
    }
}
