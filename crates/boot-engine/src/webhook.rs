//! Outbound webhook calls shared by the webhook resolver and transformer
//!
//! Credentials live in other objects and are resolved on every call, so a
//! fresh `reqwest::Client` is built per request: the client certificate and
//! trust root are part of the client, not the request.

use crate::error::EngineError;
use crate::resolver::ObjectRefResolver;
use crds::{BasicAuthRef, MtlsRef, WebhookConfig};
use reqwest::{Certificate, Client, Identity, Method, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-call timeout for webhook requests
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for outbound webhook calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookOptions {
    pub timeout: Duration,
}

impl Default for WebhookOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
        }
    }
}

/// Builds authenticated requests for a `WebhookConfig`
#[derive(Clone)]
pub(crate) struct WebhookCaller {
    object_refs: ObjectRefResolver,
    options: WebhookOptions,
}

impl WebhookCaller {
    pub(crate) fn new(object_refs: ObjectRefResolver, options: WebhookOptions) -> Self {
        Self { object_refs, options }
    }

    /// A request to `config.url` with mTLS and basic auth applied
    pub(crate) async fn request(
        &self,
        method: Method,
        config: &WebhookConfig,
    ) -> Result<RequestBuilder, EngineError> {
        let mut builder = Client::builder().use_rustls_tls().timeout(self.options.timeout);
        if let Some(mtls) = &config.mtls_ref {
            builder = self.apply_mtls(builder, mtls).await?;
        }
        let client = builder
            .build()
            .map_err(|e| EngineError::Resolution(format!("failed to build webhook client: {e}")))?;

        let mut request = client.request(method, &config.url);
        if let Some(basic) = &config.basic_auth_ref {
            let (username, password) = self.basic_auth(basic).await?;
            request = request.basic_auth(username, Some(password));
        }
        Ok(request)
    }

    async fn apply_mtls(
        &self,
        builder: reqwest::ClientBuilder,
        mtls: &MtlsRef,
    ) -> Result<reqwest::ClientBuilder, EngineError> {
        let paths = [
            mtls.client_key_path.as_str(),
            mtls.client_cert_path.as_str(),
            mtls.ca_bundle_path.as_str(),
        ];
        let resolved = self.object_refs.resolve_paths(&paths, &mtls.object_ref).await?;
        let [key, cert, ca] = resolved.as_slice() else {
            return Err(EngineError::object_ref(
                &mtls.object_ref,
                format!("expected client key, certificate and CA bundle, got {} values", resolved.len()),
            ));
        };

        let mut pem = cert.clone();
        pem.push(b'\n');
        pem.extend_from_slice(key);
        let identity = Identity::from_pem(&pem)
            .map_err(|e| EngineError::Resolution(format!("invalid client key/certificate pair: {e}")))?;
        let roots = Certificate::from_pem_bundle(ca)
            .map_err(|e| EngineError::Resolution(format!("invalid CA bundle: {e}")))?;

        let mut builder = builder.identity(identity).tls_built_in_root_certs(false);
        for root in roots {
            builder = builder.add_root_certificate(root);
        }
        if mtls.skip_verify {
            warn!(object = %mtls.object_ref, "Webhook server certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(builder)
    }

    async fn basic_auth(&self, basic: &BasicAuthRef) -> Result<(String, String), EngineError> {
        let paths = [basic.username_path.as_str(), basic.password_path.as_str()];
        let resolved = self.object_refs.resolve_paths(&paths, &basic.object_ref).await?;
        let [username, password] = resolved.as_slice() else {
            return Err(EngineError::object_ref(
                &basic.object_ref,
                format!("expected username and password, got {} values", resolved.len()),
            ));
        };
        Ok((utf8(basic, username)?, utf8(basic, password)?))
    }
}

fn utf8(basic: &BasicAuthRef, bytes: &[u8]) -> Result<String, EngineError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| EngineError::object_ref(&basic.object_ref, format!("basic auth credentials: {e}")))
}

/// Read the whole body whatever the status; error bodies become content
pub(crate) async fn read_body(response: Response) -> Result<Vec<u8>, reqwest::Error> {
    let status = response.status();
    let url = response.url().to_string();
    if status.is_success() {
        debug!(%url, %status, "Webhook responded");
    } else {
        warn!(%url, %status, "Webhook returned non-success status, passing body through");
    }
    Ok(response.bytes().await?.to_vec())
}
