//! HTTP front end tests against the in-memory store

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use boot_engine::store::mock::MockBootStore;
use boot_engine::store::BootRecordStore;
use boot_engine::{
    Assignment, BootService, ContentItem, ContentSource, Multiplexer, Profile, Selector,
    StoreError, Transformation, WebhookOptions,
};
use crds::{BuildArch, ObjectRef, SubjectSelectors};
use pxe_server::http::{router, AppState};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

const BASE: &str = "http://boot.example";

fn app(store: &MockBootStore) -> Router {
    let mux = Multiplexer::standard(BASE, Arc::new(store.clone()), WebhookOptions::default());
    router(AppState {
        service: Arc::new(BootService::new(Arc::new(store.clone()), mux)),
        request_timeout: Duration::from_secs(5),
    })
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("router is infallible");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, String::from_utf8_lossy(&body).into_owned())
}

fn worker_assignment(machine: Uuid) -> Assignment {
    Assignment {
        name: "worker-a".to_string(),
        namespace: "boot".to_string(),
        profile_name: "worker".to_string(),
        subject_selectors: SubjectSelectors {
            buildarch: vec![BuildArch::X86_64],
            uuid_list: vec![machine],
        },
        is_default: false,
    }
}

/// Store with one worker profile exposing a Butane config from a ConfigMap
fn seeded_store(machine: Uuid, content_id: Uuid) -> MockBootStore {
    let store = MockBootStore::new();
    let config_map = ObjectRef::config_map("boot", "worker-butane").with_path_query("{.data.config}");
    store.add_object(
        &config_map,
        json!({"data": {"config": "variant: fcos\nversion: 1.5.0\nstorage:\n  files:\n    - path: /etc/hostname\n      contents:\n        inline: worker\n"}}),
    );
    store.add_assignment(worker_assignment(machine));
    store.add_profile(
        Profile::new(
            "worker",
            "boot",
            "#!ipxe\nkernel /vmlinuz ignition.config.url={{ ignition }}\nboot\n",
            vec![
                ContentItem::new("ignition", ContentSource::ObjectRef(config_map))
                    .exposed(content_id)
                    .with_transformer(Transformation::ButaneToIgnition),
            ],
        )
        .expect("valid profile"),
    );
    store
}

#[tokio::test]
async fn test_healthz() {
    let (status, body) = get(app(&MockBootStore::new()), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_bootstrap_script() {
    let (status, body) = get(app(&MockBootStore::new()), "/boot.ipxe").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "#!ipxe\nchain http://boot.example/ipxe?uuid=${uuid}&buildarch=${buildarch:uristring}\n"
    );
}

#[tokio::test]
async fn test_render_boot_script() {
    let machine = Uuid::new_v4();
    let content_id = Uuid::new_v4();
    let store = seeded_store(machine, content_id);

    let (status, body) = get(app(&store), &format!("/ipxe?uuid={machine}&buildarch=x86_64")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        format!("#!ipxe\nkernel /vmlinuz ignition.config.url={BASE}/content/{content_id}\nboot\n")
    );
    // Exposed content is referenced, not fetched
    assert!(!store
        .calls()
        .iter()
        .any(|c| matches!(c, boot_engine::store::mock::StoreCall::GetObject(_))));
}

#[tokio::test]
async fn test_render_boot_without_assignment() {
    let (status, body) = get(
        app(&MockBootStore::new()),
        &format!("/ipxe?uuid={}&buildarch=arm64", Uuid::new_v4()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.starts_with("No profile selected"), "{body}");
}

#[tokio::test]
async fn test_render_boot_rejects_unknown_arch() {
    let (status, _) = get(
        app(&MockBootStore::new()),
        &format!("/ipxe?uuid={}&buildarch=sparc", Uuid::new_v4()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_content_materializes_ignition() {
    let content_id = Uuid::new_v4();
    let store = seeded_store(Uuid::new_v4(), content_id);

    let (status, body) = get(app(&store), &format!("/content/{content_id}?buildarch=x86_64")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"ignition":{"version":"3.4.0"},"storage":{"files":[{"contents":{"source":"data:,worker"},"path":"/etc/hostname"}]}}"#
    );
}

#[tokio::test]
async fn test_get_content_nil_id() {
    let (status, _) = get(
        app(&MockBootStore::new()),
        &format!("/content/{}?buildarch=x86_64", Uuid::nil()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_content_unknown_id() {
    let (status, _) = get(
        app(&MockBootStore::new()),
        &format!("/content/{}?uuid={}&buildarch=x86_64", Uuid::new_v4(), Uuid::new_v4()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Never answers within the request deadline
struct SlowStore;

#[async_trait::async_trait]
impl BootRecordStore for SlowStore {
    async fn get_profile(&self, name: &str) -> Result<Profile, StoreError> {
        Err(StoreError::NotFound(name.to_string()))
    }
    async fn find_assignment_by_selector(&self, _selector: &Selector) -> Result<Assignment, StoreError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(StoreError::NotFound("slow".to_string()))
    }
    async fn find_default_assignment(&self, _build_arch: BuildArch) -> Result<Assignment, StoreError> {
        Err(StoreError::NotFound("slow".to_string()))
    }
    async fn find_profiles_by_content_id(&self, _id: Uuid) -> Result<Vec<Profile>, StoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_render_boot_deadline() {
    let app = router(AppState {
        service: Arc::new(BootService::new(Arc::new(SlowStore), Multiplexer::new(BASE))),
        request_timeout: Duration::from_millis(20),
    });
    let (status, _) = get(app, &format!("/ipxe?uuid={}&buildarch=x86_64", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}
