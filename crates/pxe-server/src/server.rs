//! Boot server wiring
//!
//! Connects to the cluster, builds the boot service and serves the HTTP
//! routes until the listener fails or the process is stopped.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::{router, AppState};
use boot_engine::BootService;
use kube::Client;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// iPXE boot server
#[derive(Debug)]
pub struct PxeServer {
    config: ServerConfig,
    state: AppState,
}

impl PxeServer {
    /// Create a server backed by the cluster the process runs in
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let client = Client::try_default().await?;
        let service = BootService::kubernetes(
            client,
            &config.namespace,
            config.base_url.clone(),
            config.webhook_options(),
        );
        Ok(Self::with_service(config, service))
    }

    /// Create a server around an existing service
    pub fn with_service(config: ServerConfig, service: BootService) -> Self {
        let state = AppState {
            service: Arc::new(service),
            request_timeout: config.request_timeout,
        };
        Self { config, state }
    }

    /// Serve until the listener fails
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(
            addr = %self.config.listen_addr,
            base_url = %self.config.base_url,
            namespace = %self.config.namespace,
            "Boot server listening"
        );
        axum::serve(listener, router(self.state)).await?;
        Ok(())
    }
}
