// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Serve Command
//!
//! Wires the production adapters into the application services and runs the
//! HTTP API until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use appforge_core::application::{
    AppSetupService, ConfigExtractor, PromotionCoordinator, SetupPipeline, SetupStages, VersionService,
};
use appforge_core::domain::service_config::{resolve_secret, ConfigError, ServiceConfig, ServiceConfigManifest};
use appforge_core::infrastructure::db::{Database, PostgresConfig};
use appforge_core::infrastructure::event_bus::EventBus;
use appforge_core::infrastructure::image_generation::RunwareAdapter;
use appforge_core::infrastructure::llm::GeminiAdapter;
use appforge_core::infrastructure::object_store::OpendalObjectStore;
use appforge_core::infrastructure::registry::CliAppRegistry;
use appforge_core::infrastructure::repositories::{
    PostgresAppRepository, PostgresUserDirectory, PostgresVersionRepository,
};
use appforge_core::infrastructure::vercel::VercelClient;
use appforge_core::presentation::api::{self, AppState};

#[derive(Args)]
pub struct ServeCommand {
    /// Apply pending migrations before accepting requests
    #[arg(long)]
    migrate: bool,

    /// Override the listen port from config
    #[arg(short, long, env = "APPFORGE_PORT")]
    port: Option<u16>,
}

/// Resolve a required secret setting
pub(crate) fn required_secret(value: &Option<String>, name: &'static str) -> Result<String> {
    resolve_secret(value)?
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingSetting(name).into())
}

pub(crate) async fn connect_database(spec: &ServiceConfig) -> Result<Database> {
    let url = required_secret(&spec.database.url, "database.url")?;
    Database::connect(&PostgresConfig {
        connection_string: url,
        max_connections: spec.database.max_connections,
    })
    .await
    .context("Failed to connect to database")
}

pub(crate) fn vercel_client(spec: &ServiceConfig) -> Result<VercelClient> {
    let token = required_secret(&spec.vercel.token, "vercel.token")?;
    VercelClient::from_config(&spec.vercel, token).context("Failed to build Vercel client")
}

pub async fn execute(cmd: ServeCommand, config: ServiceConfigManifest) -> Result<()> {
    config.validate().context("Configuration validation failed")?;
    let spec = &config.spec;

    let database = connect_database(spec).await?;
    if cmd.migrate {
        let applied = database.migrate().await.context("Failed to apply migrations")?;
        info!(applied, "Database migrations applied");
    }
    let pool = database.get_pool().clone();

    let apps = Arc::new(PostgresAppRepository::new(pool.clone()));
    let versions = Arc::new(PostgresVersionRepository::new(pool.clone()));
    let users = Arc::new(PostgresUserDirectory::new(pool));

    let event_bus = EventBus::with_default_capacity();

    let gemini = GeminiAdapter::new(
        spec.gemini.endpoint.clone(),
        required_secret(&spec.gemini.api_key, "gemini.api_key")?,
        spec.gemini.model.clone(),
    )
    .context("Failed to build Gemini client")?;
    let images = RunwareAdapter::new(
        spec.runware.endpoint.clone(),
        required_secret(&spec.runware.api_key, "runware.api_key")?,
        spec.runware.model.clone(),
    )
    .context("Failed to build Runware client")?;
    let store = OpendalObjectStore::s3(&spec.object_store).context("Failed to configure object store")?;
    let registry = Arc::new(CliAppRegistry::new(&spec.registry));
    let platform = Arc::new(vercel_client(spec)?);

    let pipeline = SetupPipeline::spawn(SetupStages {
        apps: apps.clone(),
        users,
        extractor: Arc::new(ConfigExtractor::new(Arc::new(gemini))),
        registry: registry.clone(),
        images: Arc::new(images),
        store: Arc::new(store),
        event_bus: event_bus.clone(),
        platform_domain: spec.platform_domain.clone(),
    });

    let state = AppState {
        apps: Arc::new(AppSetupService::new(
            apps.clone(),
            registry,
            pipeline,
            event_bus.clone(),
            spec.platform_domain.clone(),
        )),
        versions: Arc::new(VersionService::new(apps.clone(), versions.clone(), event_bus.clone())),
        promotions: Arc::new(PromotionCoordinator::new(apps, versions, platform, event_bus)),
    };

    if let Some(metrics_port) = spec.observability.metrics_port {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }

    let port = cmd.port.unwrap_or(spec.server.port);
    let addr = format!("{}:{}", spec.server.bind_address, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(platform_domain = %spec.platform_domain, "appforge listening on {}", addr);

    axum::serve(listener, api::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("appforge shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
