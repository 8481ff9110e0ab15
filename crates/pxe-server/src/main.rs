//! iPXE boot server binary

use pxe_server::{PxeServer, ServerConfig, ServerError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Webhook clients and the kube client both need a process-wide provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting iPXE boot server");

    let config = ServerConfig::from_env()?;
    info!("Configuration:");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Base URL: {}", config.base_url);
    info!("  Namespace: {}", config.namespace);
    info!("  Request timeout: {:?}", config.request_timeout);
    info!("  Webhook timeout: {:?}", config.webhook_timeout);

    PxeServer::new(config).await?.run().await
}
