//! Exposed content lookup by ID

use crate::error::EngineError;
use crate::mux::Multiplexer;
use crate::store::BootRecordStore;
use crate::types::Selector;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Materializes one exposed content item, the target of a reference URL
#[derive(Clone)]
pub struct ContentEngine {
    records: Arc<dyn BootRecordStore>,
    mux: Arc<Multiplexer>,
}

impl std::fmt::Debug for ContentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentEngine").field("mux", &self.mux).finish_non_exhaustive()
    }
}

impl ContentEngine {
    pub fn new(records: Arc<dyn BootRecordStore>, mux: Arc<Multiplexer>) -> Self {
        Self { records, mux }
    }

    /// Resolve and transform the item exposed as `content_id`.
    ///
    /// The content ID replaces the selector's UUID; the build architecture is kept.
    pub async fn get_by_id(&self, content_id: Uuid, selector: &Selector) -> Result<Vec<u8>, EngineError> {
        if content_id.is_nil() {
            return Err(EngineError::InvalidId(content_id));
        }

        let profiles = self.records.find_profiles_by_content_id(content_id).await?;
        let (profile, item) = profiles
            .iter()
            .find_map(|p| p.content_by_id(content_id).map(|item| (p, item)))
            .ok_or(EngineError::ContentNotFound(content_id))?;
        if profiles.len() > 1 {
            warn!(
                content_id = %content_id,
                count = profiles.len(),
                "Content ID exposed by several profiles, using {}",
                profile.name
            );
        }

        info!(
            content_id = %content_id,
            profile = %profile.name,
            content = %item.name,
            buildarch = %selector.build_arch,
            "Serving exposed content"
        );
        let effective = selector.with_uuid(content_id);
        self.mux.resolve_and_transform(item, &effective).await
    }
}
