//! Server configuration from environment variables

use crate::error::ServerError;
use boot_engine::WebhookOptions;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration of the boot server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to (`PXE_LISTEN_ADDR`)
    pub listen_addr: SocketAddr,
    /// Externally reachable base URL (`PXE_BASE_URL`, required)
    pub base_url: String,
    /// Namespace holding Profiles and Assignments (`WATCH_NAMESPACE`)
    pub namespace: String,
    /// Deadline for one boot or content request (`PXE_REQUEST_TIMEOUT_SECS`)
    pub request_timeout: Duration,
    /// Deadline for one outbound webhook call (`PXE_WEBHOOK_TIMEOUT_SECS`)
    pub webhook_timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let listen_addr = lookup("PXE_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr.parse().map_err(|e| {
            ServerError::InvalidConfig(format!("PXE_LISTEN_ADDR {listen_addr:?}: {e}"))
        })?;

        let base_url = lookup("PXE_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ServerError::InvalidConfig("PXE_BASE_URL environment variable is required".to_string())
            })?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ServerError::InvalidConfig(format!(
                "PXE_BASE_URL {base_url:?} must be an http(s) URL"
            )));
        }

        Ok(Self {
            listen_addr,
            base_url: base_url.trim_end_matches('/').to_string(),
            namespace: lookup("WATCH_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            request_timeout: seconds(&lookup, "PXE_REQUEST_TIMEOUT_SECS")?,
            webhook_timeout: seconds(&lookup, "PXE_WEBHOOK_TIMEOUT_SECS")?,
        })
    }

    pub fn webhook_options(&self) -> WebhookOptions {
        WebhookOptions {
            timeout: self.webhook_timeout,
        }
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Duration, ServerError> {
    let Some(raw) = lookup(key) else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ServerError::InvalidConfig(format!("{key} must be greater than zero"))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ServerError::InvalidConfig(format!("{key} {raw:?}: {e}"))),
    }
}
