// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Setup
//!
//! `AppSetupService` handles the synchronous application use cases. Creation
//! writes a provisional record and hands the rest to the [`SetupPipeline`],
//! a background actor that runs the best-effort stages for each new app:
//!
//! ```text
//! config extraction ─▶ persist brand fields ─▶ owner email ─▶ registry create
//!                                                               │
//!                                   (spawned) logo generate ─▶ download ─▶ upload
//!                                                               │
//!                                                   persist logo ─▶ registry update
//! ```
//!
//! A stage failure is logged with the app id, counted in
//! `appforge_setup_stage_failures_total{stage}` and published as a
//! [`SetupEvent`]. Nothing is retried or rolled back and the app status is
//! never changed by the pipeline.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::application::config_extraction::ConfigExtractor;
use crate::domain::app::{App, AppConfig, AppId, AppUpdate};
use crate::domain::events::SetupEvent;
use crate::domain::registry::{AppRegistry, RegistrySyncRequest};
use crate::domain::repository::{AppRepository, RepositoryError, UserDirectory};
use crate::domain::storage::{logo_key, AssetGenerationError, ImageGenerator, ObjectStore};
use crate::infrastructure::event_bus::EventBus;

pub const UNKNOWN_OWNER_EMAIL: &str = "unknown@example.com";
pub const STAGE_FAILURES_METRIC: &str = "appforge_setup_stage_failures_total";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("app {0} not found")]
    NotFound(AppId),

    #[error("no updatable fields supplied")]
    NoFields,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Work item for one newly created application
#[derive(Debug, Clone)]
pub struct SetupJob {
    pub app_id: AppId,
    pub user_id: String,
    pub description: String,
}

/// Collaborators shared by every pipeline run
#[derive(Clone)]
pub struct SetupStages {
    pub apps: Arc<dyn AppRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub extractor: Arc<ConfigExtractor>,
    pub registry: Arc<dyn AppRegistry>,
    pub images: Arc<dyn ImageGenerator>,
    pub store: Arc<dyn ObjectStore>,
    pub event_bus: EventBus,
    pub platform_domain: String,
}

fn record_stage_failure(stage: &'static str) {
    metrics::counter!(STAGE_FAILURES_METRIC, "stage" => stage).increment(1);
}

impl SetupStages {
    /// Run every stage for one app. Returns once the registry create sync is
    /// done; the asset stage continues on its own task.
    pub async fn run(&self, job: SetupJob) {
        let app_id = job.app_id;

        let config = self.resolve_config(&job).await;
        let owner_email = self.owner_email(&job).await;

        let request = RegistrySyncRequest::create(app_id, config.app_name.clone(), owner_email);
        self.sync_registry(&request, "registry_create").await;

        let stages = self.clone();
        tokio::spawn(
            async move {
                stages.attach_logo(app_id, &config).await;
                stages.event_bus.publish_setup_event(SetupEvent::SetupCompleted {
                    app_id,
                    completed_at: Utc::now(),
                });
            }
            .instrument(info_span!("setup_assets", app_id = %app_id)),
        );
    }

    async fn resolve_config(&self, job: &SetupJob) -> AppConfig {
        let app_id = job.app_id;

        let (config, used_fallback) = match self.extractor.extract(&job.description).await {
            Ok(config) => (config, false),
            Err(e) => {
                warn!(app_id = %app_id, stage = "config_extraction", error = %e, "config extraction failed, using defaults");
                record_stage_failure("config_extraction");
                (AppConfig::default(), true)
            }
        };

        let update = AppUpdate::from_config(app_id, &config, &self.platform_domain);
        let persisted = match self.apps.update(app_id, &update).await {
            Ok(Some(app)) => {
                info!(app_id = %app_id, app_name = %app.name, production_url = %app.production_url, "brand config persisted");
                true
            }
            Ok(None) => {
                warn!(app_id = %app_id, stage = "config_persist", "app disappeared before brand config was persisted");
                record_stage_failure("config_persist");
                false
            }
            Err(e) => {
                error!(app_id = %app_id, stage = "config_persist", error = %e, "failed to persist brand config");
                record_stage_failure("config_persist");
                false
            }
        };

        self.event_bus.publish_setup_event(SetupEvent::ConfigResolved {
            app_id,
            app_name: config.app_name.clone(),
            category: config.category,
            color_scheme: config.color_scheme,
            used_fallback,
            persisted,
            resolved_at: Utc::now(),
        });

        config
    }

    async fn owner_email(&self, job: &SetupJob) -> String {
        match self.users.owner_email(&job.user_id).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                warn!(app_id = %job.app_id, user_id = %job.user_id, "owner has no email on record");
                UNKNOWN_OWNER_EMAIL.to_string()
            }
            Err(e) => {
                warn!(app_id = %job.app_id, user_id = %job.user_id, error = %e, "failed to look up owner email");
                UNKNOWN_OWNER_EMAIL.to_string()
            }
        }
    }

    async fn sync_registry(&self, request: &RegistrySyncRequest, stage: &'static str) {
        let app_id = request.app_id;
        let event = match self.registry.sync(request).await {
            Ok(()) => {
                info!(app_id = %app_id, mode = %request.mode, "registry synced");
                SetupEvent::RegistrySynced {
                    app_id,
                    mode: request.mode.to_string(),
                    synced_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!(app_id = %app_id, stage, mode = %request.mode, error = %e, "registry sync failed");
                record_stage_failure(stage);
                SetupEvent::RegistrySyncFailed {
                    app_id,
                    mode: request.mode.to_string(),
                    reason: e.to_string(),
                    failed_at: Utc::now(),
                }
            }
        };
        self.event_bus.publish_setup_event(event);
    }

    async fn attach_logo(&self, app_id: AppId, config: &AppConfig) {
        let logo_url = match self.generate_logo(app_id, config).await {
            Ok(url) => url,
            Err(e) => {
                warn!(app_id = %app_id, stage = "asset_generation", error = %e, "logo generation failed");
                record_stage_failure("asset_generation");
                self.event_bus.publish_setup_event(SetupEvent::AssetGenerationFailed {
                    app_id,
                    reason: e.to_string(),
                    failed_at: Utc::now(),
                });
                return;
            }
        };

        match self.apps.update(app_id, &AppUpdate::logo(logo_url.clone())).await {
            Ok(Some(_)) => {
                info!(app_id = %app_id, logo_url = %logo_url, "logo attached");
                self.event_bus.publish_setup_event(SetupEvent::LogoAttached {
                    app_id,
                    logo_url: logo_url.clone(),
                    attached_at: Utc::now(),
                });
            }
            Ok(None) => {
                warn!(app_id = %app_id, stage = "logo_persist", "app disappeared before logo was persisted");
                record_stage_failure("logo_persist");
                return;
            }
            Err(e) => {
                error!(app_id = %app_id, stage = "logo_persist", error = %e, "failed to persist logo");
                record_stage_failure("logo_persist");
                return;
            }
        }

        let request = RegistrySyncRequest::update(app_id, config.app_name.clone(), Some(logo_url));
        self.sync_registry(&request, "registry_update").await;
    }

    async fn generate_logo(&self, app_id: AppId, config: &AppConfig) -> Result<String, AssetGenerationError> {
        let temporary_url = self
            .images
            .generate_logo(&config.app_name, config.category.as_str(), config.color_scheme.as_str())
            .await?;
        debug!(app_id = %app_id, url = %temporary_url, "logo generated");

        let bytes = self.images.download(&temporary_url).await?;
        let url = self
            .store
            .put(&logo_key(&app_id.to_string()), bytes, "image/png")
            .await?;
        Ok(url)
    }
}

/// Background actor executing [`SetupJob`]s. Each job runs on its own task.
#[derive(Clone)]
pub struct SetupPipeline {
    sender: mpsc::UnboundedSender<SetupJob>,
}

impl SetupPipeline {
    /// Start the worker task. It exits when every handle has been dropped.
    pub fn spawn(stages: SetupStages) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SetupJob>();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let stages = stages.clone();
                let span = info_span!("setup", app_id = %job.app_id);
                tokio::spawn(async move { stages.run(job).await }.instrument(span));
            }
            debug!("setup pipeline worker stopped");
        });

        Self { sender }
    }

    /// Queue a job. Returns false if the worker is gone.
    pub fn enqueue(&self, job: SetupJob) -> bool {
        self.sender.send(job).is_ok()
    }
}

pub struct AppSetupService {
    apps: Arc<dyn AppRepository>,
    registry: Arc<dyn AppRegistry>,
    pipeline: SetupPipeline,
    event_bus: EventBus,
    platform_domain: String,
}

impl AppSetupService {
    pub fn new(
        apps: Arc<dyn AppRepository>,
        registry: Arc<dyn AppRegistry>,
        pipeline: SetupPipeline,
        event_bus: EventBus,
        platform_domain: impl Into<String>,
    ) -> Self {
        Self {
            apps,
            registry,
            pipeline,
            event_bus,
            platform_domain: platform_domain.into(),
        }
    }

    /// Insert the provisional record and queue the setup pipeline. Returns
    /// as soon as the insert is durable.
    pub async fn create_app(&self, user_id: &str, description: &str) -> Result<App, AppError> {
        let app = App::provisional(user_id, description, &self.platform_domain);
        self.apps.insert(&app).await?;

        info!(app_id = %app.id, user_id, production_url = %app.production_url, "app created");
        self.event_bus.publish_setup_event(SetupEvent::AppCreated {
            app_id: app.id,
            production_url: app.production_url.clone(),
            created_at: app.created_at,
        });

        let job = SetupJob {
            app_id: app.id,
            user_id: user_id.to_string(),
            description: description.to_string(),
        };
        if !self.pipeline.enqueue(job) {
            error!(app_id = %app.id, "setup pipeline is not running, app keeps placeholder config");
            record_stage_failure("enqueue");
        }

        Ok(app)
    }

    /// Apps owned by someone else are reported as missing.
    pub async fn get_app(&self, id: AppId, user_id: &str) -> Result<App, AppError> {
        self.apps.find_owned(id, user_id).await?.ok_or(AppError::NotFound(id))
    }

    pub async fn list_apps(&self, user_id: &str) -> Result<Vec<App>, AppError> {
        Ok(self.apps.list_by_owner(user_id).await?)
    }

    /// Apply a user edit. A rename is mirrored to the registry in the background.
    pub async fn update_app(&self, id: AppId, user_id: &str, update: AppUpdate) -> Result<App, AppError> {
        if update.is_empty() {
            return Err(AppError::NoFields);
        }

        let app = self
            .apps
            .update_owned(id, user_id, &update)
            .await?
            .ok_or(AppError::NotFound(id))?;

        if update.name.is_some() {
            let registry = self.registry.clone();
            let request = RegistrySyncRequest::update(app.id, app.name.clone(), app.logo.clone());
            tokio::spawn(async move {
                if let Err(e) = registry.sync(&request).await {
                    warn!(app_id = %request.app_id, stage = "registry_rename", error = %e, "registry sync failed");
                    record_stage_failure("registry_rename");
                }
            });
        }

        Ok(app)
    }

    pub async fn delete_app(&self, id: AppId, user_id: &str) -> Result<(), AppError> {
        if self.apps.delete(id, user_id).await? {
            info!(app_id = %id, "app deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(id))
        }
    }
}
