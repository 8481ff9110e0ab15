//! HTTP routes for iPXE clients
//!
//! - `GET /boot.ipxe`: bootstrap script chaining into `/ipxe`
//! - `GET /ipxe?uuid=&buildarch=`: rendered boot script for the machine
//! - `GET /content/{id}?buildarch=`: one exposed content item
//! - `GET /healthz`: liveness

use crate::error::HttpError;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use boot_engine::{BootService, Selector};
use crds::BuildArch;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const IPXE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const CONTENT_CONTENT_TYPE: &str = "application/octet-stream";

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<BootService>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Run an engine call under the request deadline
    async fn within_deadline(
        &self,
        call: impl Future<Output = Result<Vec<u8>, boot_engine::EngineError>>,
    ) -> Result<Vec<u8>, HttpError> {
        Ok(tokio::time::timeout(self.request_timeout, call).await??)
    }
}

#[derive(Debug, Deserialize)]
struct BootQuery {
    uuid: Uuid,
    buildarch: BuildArch,
}

#[derive(Debug, Deserialize)]
struct ContentQuery {
    #[serde(default)]
    uuid: Option<Uuid>,
    buildarch: BuildArch,
}

/// Build the axum router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/boot.ipxe", get(bootstrap))
        .route("/ipxe", get(render_boot))
        .route("/content/{id}", get(get_content))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn bootstrap(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, IPXE_CONTENT_TYPE)], state.service.bootstrap())
}

async fn render_boot(
    State(state): State<AppState>,
    Query(query): Query<BootQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let selector = Selector::new(query.uuid, query.buildarch);
    let script = state
        .within_deadline(state.service.render_boot(&selector))
        .await?;
    Ok(([(header::CONTENT_TYPE, IPXE_CONTENT_TYPE)], script))
}

async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ContentQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let selector = Selector::new(query.uuid.unwrap_or_else(Uuid::nil), query.buildarch);
    let content = state
        .within_deadline(state.service.get_content(id, &selector))
        .await?;
    Ok(([(header::CONTENT_TYPE, CONTENT_CONTENT_TYPE)], content))
}
