// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use appforge_core::application::{
    AppSetupService, ConfigExtractor, PromotionCoordinator, SetupPipeline, SetupStages, VersionService,
};
use appforge_core::domain::domain_name::DEFAULT_PLATFORM_DOMAIN;
use appforge_core::domain::storage::{AssetGenerationError, ImageGenerator};
use appforge_core::infrastructure::event_bus::EventBus;
use appforge_core::infrastructure::llm::GeminiAdapter;
use appforge_core::infrastructure::object_store::OpendalObjectStore;
use appforge_core::infrastructure::registry::InMemoryAppRegistry;
use appforge_core::infrastructure::repositories::{
    InMemoryAppRepository, InMemoryUserDirectory, InMemoryVersionRepository,
};
use appforge_core::infrastructure::vercel::VercelClient;
use appforge_core::presentation::api::{self, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct NoImages;

#[async_trait]
impl ImageGenerator for NoImages {
    async fn generate_logo(&self, _: &str, _: &str, _: &str) -> Result<String, AssetGenerationError> {
        Err(AssetGenerationError::Generation("disabled in tests".to_string()))
    }

    async fn download(&self, _url: &str) -> Result<Bytes, AssetGenerationError> {
        Err(AssetGenerationError::Download("disabled in tests".to_string()))
    }
}

/// Router over in-memory stores. Gemini and Vercel both point at `upstream`.
fn router(upstream: &str) -> Router {
    let apps = Arc::new(InMemoryAppRepository::new());
    let versions = Arc::new(InMemoryVersionRepository::new());
    let event_bus = EventBus::new(64);
    let registry = Arc::new(InMemoryAppRegistry::new());

    let gemini =
        GeminiAdapter::new(upstream.to_string(), "key".to_string(), "gemini-2.5-flash".to_string()).unwrap();
    let pipeline = SetupPipeline::spawn(SetupStages {
        apps: apps.clone(),
        users: Arc::new(InMemoryUserDirectory::new()),
        extractor: Arc::new(ConfigExtractor::new(Arc::new(gemini))),
        registry: registry.clone(),
        images: Arc::new(NoImages),
        store: Arc::new(OpendalObjectStore::memory("https://assets.example").unwrap()),
        event_bus: event_bus.clone(),
        platform_domain: DEFAULT_PLATFORM_DOMAIN.to_string(),
    });
    let platform = Arc::new(VercelClient::new(upstream, "token", None).unwrap());

    api::app(AppState {
        apps: Arc::new(AppSetupService::new(
            apps.clone(),
            registry,
            pipeline,
            event_bus.clone(),
            DEFAULT_PLATFORM_DOMAIN,
        )),
        versions: Arc::new(VersionService::new(apps.clone(), versions.clone(), event_bus.clone())),
        promotions: Arc::new(PromotionCoordinator::new(apps, versions, platform, event_bus)),
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_as(app, "user-1", method, uri, body).await
}

async fn send_as(
    app: &Router,
    user_id: &str,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user_id)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_app(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/apps", Some(json!({ "description": "a recipe site" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let server = mockito::Server::new_async().await;
    let app = router(&server.url());
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_app_requires_user_header() {
    let server = mockito::Server::new_async().await;
    let app = router(&server.url());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/apps")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"description":"x"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_app_returns_provisional_record() {
    let server = mockito::Server::new_async().await;
    let app = router(&server.url());

    let (status, body) = send(&app, Method::POST, "/apps", Some(json!({ "description": "a recipe site" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "MyApp");
    assert_eq!(body["status"], "building");
    assert!(body["production_url"].as_str().unwrap().ends_with(".rapidbuild.app"));
}

#[tokio::test]
async fn test_apps_are_scoped_to_their_owner() {
    let server = mockito::Server::new_async().await;
    let app = router(&server.url());
    let app_id = create_app(&app).await;
    let uri = format!("/apps/{}", app_id);

    let (status, body) = send_as(&app, "user-2", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = send_as(&app, "user-2", Method::PATCH, &uri, Some(json!({ "name": "Stolen" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_as(&app, "user-2", Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["name"], "Stolen");

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_version_lifecycle_status_codes() {
    let server = mockito::Server::new_async().await;
    let app = router(&server.url());
    let app_id = create_app(&app).await;

    let (status, version) = send(&app, Method::POST, &format!("/apps/{}/versions", app_id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(version["version_number"], 1);
    assert_eq!(version["status"], "pending");
    let version_id = version["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::PATCH, &format!("/versions/{}", version_id), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "no_fields");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/versions/{}", version_id),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/versions/{}", version_id),
        Some(json!({ "status": "shipped" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/versions/{}", version_id),
        Some(json!({ "status": "building", "s3_key": "code/v1.zip" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["s3_code_path"], "code/v1.zip");

    let (status, _) = send(&app, Method::DELETE, &format!("/versions/{}", version_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &format!("/versions/{}", version_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_unknown_app_version_create_is_not_found() {
    let server = mockito::Server::new_async().await;
    let app = router(&server.url());
    let (status, _) = send(
        &app,
        Method::POST,
        "/apps/2028362b-a14a-43ac-87d8-0e26c7401623/versions",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_promotion_status_codes() {
    let mut server = mockito::Server::new_async().await;
    let app = router(&server.url());
    let app_id = create_app(&app).await;

    let (_, version) = send(&app, Method::POST, &format!("/apps/{}/versions", app_id), None).await;
    let version_id = version["id"].as_str().unwrap().to_string();
    let promote_uri = format!("/versions/{}/promote", version_id);

    // pending
    let (status, body) = send(&app, Method::POST, &promote_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_state");

    for step in [json!({ "status": "building" }), json!({ "status": "completed" })] {
        let (status, _) = send(&app, Method::PATCH, &format!("/versions/{}", version_id), Some(step)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, Method::POST, &promote_uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "missing_deployment");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/versions/{}", version_id),
        Some(json!({ "vercel_deploy_id": "dpl_abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, &promote_uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "missing_project");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/apps/{}", app_id),
        Some(json!({ "vercel_project_id": "prj_123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let failing = server
        .mock("PATCH", mockito::Matcher::Regex(r"^/v9/projects/prj_123/domains/.+$".to_string()))
        .with_status(500)
        .with_body("upstream unavailable")
        .create_async()
        .await;
    let (status, body) = send(&app, Method::POST, &promote_uri, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "platform_error");
    failing.assert_async().await;
    failing.remove_async().await;

    let succeeding = server
        .mock("PATCH", mockito::Matcher::Regex(r"^/v9/projects/prj_123/domains/.+$".to_string()))
        .match_body(mockito::Matcher::PartialJson(json!({ "target": "dpl_abc" })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    let (status, body) = send(&app, Method::POST, &promote_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "promoted");

    // repeat is a no-op
    let (status, _) = send(&app, Method::POST, &promote_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    succeeding.assert_async().await;

    let (_, app_body) = send(&app, Method::GET, &format!("/apps/{}", app_id), None).await;
    assert_eq!(app_body["prod_version"], 1);
}
