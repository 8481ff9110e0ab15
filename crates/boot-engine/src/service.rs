//! Read interface consumed by the HTTP front end

use crate::content::ContentEngine;
use crate::error::EngineError;
use crate::ipxe::IpxeEngine;
use crate::mux::Multiplexer;
use crate::store::kubernetes::{KubeBootRecordStore, KubeObjectStore};
use crate::store::BootRecordStore;
use crate::types::Selector;
use crate::webhook::WebhookOptions;
use std::sync::Arc;
use uuid::Uuid;

/// Boot script rendering, exposed content and the bootstrap script
#[derive(Debug)]
pub struct BootService {
    ipxe: IpxeEngine,
    content: ContentEngine,
}

impl BootService {
    /// Both engines share one multiplexer
    pub fn new(records: Arc<dyn BootRecordStore>, mux: Multiplexer) -> Self {
        let mux = Arc::new(mux);
        Self {
            ipxe: IpxeEngine::new(Arc::clone(&records), Arc::clone(&mux)),
            content: ContentEngine::new(records, mux),
        }
    }

    /// Service reading records from `namespace` and objects cluster-wide
    pub fn kubernetes(
        client: kube::Client,
        namespace: &str,
        base_url: impl Into<String>,
        options: WebhookOptions,
    ) -> Self {
        let objects = Arc::new(KubeObjectStore::new(client.clone()));
        let records = Arc::new(KubeBootRecordStore::new(client, namespace));
        Self::new(records, Multiplexer::standard(base_url, objects, options))
    }

    pub async fn render_boot(&self, selector: &Selector) -> Result<Vec<u8>, EngineError> {
        self.ipxe.find_profile_and_render(selector).await
    }

    pub async fn get_content(&self, id: Uuid, selector: &Selector) -> Result<Vec<u8>, EngineError> {
        self.content.get_by_id(id, selector).await
    }

    pub fn bootstrap(&self) -> Vec<u8> {
        self.ipxe.bootstrap()
    }
}
