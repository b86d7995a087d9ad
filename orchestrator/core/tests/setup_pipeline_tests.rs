// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use appforge_core::application::{AppSetupService, ConfigExtractor, SetupPipeline, SetupStages};
use appforge_core::domain::app::{App, AppCategory, AppId, AppStatus, ColorScheme};
use appforge_core::domain::domain_name::DEFAULT_PLATFORM_DOMAIN;
use appforge_core::domain::events::SetupEvent;
use appforge_core::domain::registry::SyncMode;
use appforge_core::domain::repository::AppRepository;
use appforge_core::domain::storage::{AssetGenerationError, ImageGenerator};
use appforge_core::infrastructure::event_bus::{DomainEvent, EventBus, EventReceiver};
use appforge_core::infrastructure::llm::GeminiAdapter;
use appforge_core::infrastructure::object_store::OpendalObjectStore;
use appforge_core::infrastructure::registry::InMemoryAppRegistry;
use appforge_core::infrastructure::repositories::{InMemoryAppRepository, InMemoryUserDirectory};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const ASSET_BASE_URL: &str = "https://rapidbuild-assets.s3.amazonaws.com";

/// Image generator that either serves a fixed PNG or fails at generation
struct ScriptedImages {
    fail_with: Option<&'static str>,
}

#[async_trait]
impl ImageGenerator for ScriptedImages {
    async fn generate_logo(
        &self,
        app_name: &str,
        _category: &str,
        _color_scheme: &str,
    ) -> Result<String, AssetGenerationError> {
        match self.fail_with {
            Some(reason) => Err(AssetGenerationError::Generation(reason.to_string())),
            None => Ok(format!("https://im.runware.ai/image/{}.png", app_name)),
        }
    }

    async fn download(&self, _url: &str) -> Result<Bytes, AssetGenerationError> {
        Ok(Bytes::from_static(b"\x89PNG\r\n"))
    }
}

struct Harness {
    service: AppSetupService,
    apps: Arc<InMemoryAppRepository>,
    registry: InMemoryAppRegistry,
    events: EventReceiver,
}

fn harness(gemini_url: &str, registry: InMemoryAppRegistry, images: ScriptedImages) -> Harness {
    let apps = Arc::new(InMemoryAppRepository::new());
    let event_bus = EventBus::new(256);
    let events = event_bus.subscribe();

    let gemini = GeminiAdapter::new(gemini_url.to_string(), "test-key".to_string(), "gemini-2.5-flash".to_string())
        .unwrap();
    let registry_handle = Arc::new(registry.clone());

    let pipeline = SetupPipeline::spawn(SetupStages {
        apps: apps.clone(),
        users: Arc::new(InMemoryUserDirectory::new().with_user("user-1", "owner@example.com")),
        extractor: Arc::new(ConfigExtractor::new(Arc::new(gemini))),
        registry: registry_handle.clone(),
        images: Arc::new(images),
        store: Arc::new(OpendalObjectStore::memory(ASSET_BASE_URL).unwrap()),
        event_bus: event_bus.clone(),
        platform_domain: DEFAULT_PLATFORM_DOMAIN.to_string(),
    });

    let service = AppSetupService::new(apps.clone(), registry_handle, pipeline, event_bus, DEFAULT_PLATFORM_DOMAIN);

    Harness {
        service,
        apps,
        registry,
        events,
    }
}

/// Collect this app's setup events up to and including `SetupCompleted`
async fn wait_for_completion(events: &mut EventReceiver, app_id: AppId) -> Vec<SetupEvent> {
    let mut seen = Vec::new();
    timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.expect("event bus closed");
            if let DomainEvent::Setup(setup) = event {
                if setup.app_id() != app_id {
                    continue;
                }
                let done = matches!(setup, SetupEvent::SetupCompleted { .. });
                seen.push(setup);
                if done {
                    return;
                }
            }
        }
    })
    .await
    .expect("setup pipeline did not complete");
    seen
}

fn gemini_reply(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
    .to_string()
}

async fn reload(apps: &InMemoryAppRepository, id: AppId) -> App {
    apps.find_by_id(id).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_successful_setup_brands_app_and_attaches_logo() {
    let mut server = mockito::Server::new_async().await;
    let reply = "```json\n{\"appName\":\"Flavorly\",\"displayName\":\"Flavorly Kitchen\",\"requiresAuth\":true,\
                 \"allowSignup\":true,\"category\":\"social\",\"keywords\":[\"recipes\",\"cooking\"],\
                 \"colorScheme\":\"orange\"}\n```";
    let mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(mockito::Matcher::UrlEncoded("key".into(), "test-key".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(gemini_reply(reply))
        .create_async()
        .await;

    let mut h = harness(&server.url(), InMemoryAppRegistry::new(), ScriptedImages { fail_with: None });

    let created = h.service.create_app("user-1", "a recipe sharing site").await.unwrap();
    assert_eq!(created.name, "MyApp");
    assert_eq!(created.status, AppStatus::Building);

    let events = wait_for_completion(&mut h.events, created.id).await;
    mock.assert_async().await;

    let app = reload(&h.apps, created.id).await;
    assert_eq!(app.name, "Flavorly");
    assert_eq!(app.display_name, "Flavorly Kitchen");
    assert_eq!(app.category, AppCategory::Social);
    assert_eq!(app.color_scheme, ColorScheme::Orange);
    assert_eq!(app.status, AppStatus::Building);
    assert!(app.production_url.starts_with("flavorly-"));
    assert!(app.production_url.ends_with(".rapidbuild.app"));
    assert_eq!(
        app.logo.as_deref(),
        Some(format!("{}/apps/{}/logo.png", ASSET_BASE_URL, created.id).as_str())
    );

    let calls = h.registry.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].mode, SyncMode::Create);
    assert_eq!(calls[0].name, "Flavorly");
    assert_eq!(calls[0].owner_email.as_deref(), Some("owner@example.com"));
    assert_eq!(calls[1].mode, SyncMode::Update);
    assert_eq!(calls[1].logo, app.logo);

    assert!(events
        .iter()
        .any(|e| matches!(e, SetupEvent::ConfigResolved { used_fallback: false, .. })));
    assert!(events.iter().any(|e| matches!(e, SetupEvent::LogoAttached { .. })));
}

#[tokio::test]
async fn test_extraction_failure_falls_back_to_defaults() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(mockito::Matcher::Any)
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let mut h = harness(&server.url(), InMemoryAppRegistry::new(), ScriptedImages { fail_with: None });

    let created = h.service.create_app("user-1", "something").await.unwrap();
    let events = wait_for_completion(&mut h.events, created.id).await;

    let app = reload(&h.apps, created.id).await;
    assert_eq!(app.name, "MyApp");
    assert_eq!(app.display_name, "My App");
    assert_eq!(app.category, AppCategory::Other);
    assert_eq!(app.color_scheme, ColorScheme::Blue);
    assert_eq!(app.status, AppStatus::Building);
    assert!(app.logo.is_some());

    assert!(events
        .iter()
        .any(|e| matches!(e, SetupEvent::ConfigResolved { used_fallback: true, persisted: true, .. })));
    assert_eq!(h.registry.calls()[0].name, "MyApp");
}

#[tokio::test]
async fn test_registry_failure_does_not_stop_logo_stage() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(gemini_reply(r#"{"appName":"Nexora","category":"dashboard","colorScheme":"teal"}"#))
        .create_async()
        .await;

    let mut h = harness(
        &server.url(),
        InMemoryAppRegistry::failing("app-manager exited with status 1"),
        ScriptedImages { fail_with: None },
    );

    let created = h.service.create_app("user-2", "an analytics dashboard").await.unwrap();
    let events = wait_for_completion(&mut h.events, created.id).await;

    let app = reload(&h.apps, created.id).await;
    assert_eq!(app.name, "Nexora");
    assert!(app.logo.is_some());

    let failures = events
        .iter()
        .filter(|e| matches!(e, SetupEvent::RegistrySyncFailed { .. }))
        .count();
    assert_eq!(failures, 2);

    // owner unknown to the directory
    assert_eq!(h.registry.calls()[0].owner_email.as_deref(), Some("unknown@example.com"));
}

#[tokio::test]
async fn test_asset_failure_leaves_logo_empty() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(gemini_reply(r#"{"appName":"Taskly","category":"productivity","colorScheme":"green"}"#))
        .create_async()
        .await;

    let mut h = harness(
        &server.url(),
        InMemoryAppRegistry::new(),
        ScriptedImages {
            fail_with: Some("no images returned"),
        },
    );

    let created = h.service.create_app("user-1", "a todo list").await.unwrap();
    let events = wait_for_completion(&mut h.events, created.id).await;

    let app = reload(&h.apps, created.id).await;
    assert_eq!(app.name, "Taskly");
    assert!(app.logo.is_none());

    assert!(events
        .iter()
        .any(|e| matches!(e, SetupEvent::AssetGenerationFailed { reason, .. } if reason.contains("no images returned"))));
    // no logo, no update sync
    let calls = h.registry.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].mode, SyncMode::Create);
}

#[tokio::test]
async fn test_create_returns_before_pipeline_runs() {
    let server = mockito::Server::new_async().await;
    let h = harness(&server.url(), InMemoryAppRegistry::new(), ScriptedImages { fail_with: None });

    let created = h.service.create_app("user-1", "a blog").await.unwrap();

    let stored = reload(&h.apps, created.id).await;
    assert_eq!(stored.name, "MyApp");
    assert_eq!(stored.display_name, "My App");
    assert_eq!(stored.description, "a blog");
    assert_eq!(stored.production_url, created.production_url);
}
