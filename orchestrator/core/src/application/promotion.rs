// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Promotion Coordinator
//!
//! Repoints an application's production hostname at a completed version's
//! deployment.
//!
//! Preconditions are checked in order and each has its own error:
//!
//! 1. the version exists (`NotFound`)
//! 2. it is `completed` (`InvalidState`)
//! 3. it has a deployment id (`MissingDeployment`)
//! 4. its app has a deployment project id (`MissingProject`)
//!
//! After the platform call succeeds the app's production pointer is written,
//! then the version moves to `promoted` if it is still `completed`. The two
//! writes are not atomic; a retry after a crash between them redoes the
//! platform call, which reports the deployment as already serving. A
//! version that is already `promoted` and is the app's current production
//! version returns success without calling the platform, so repeating a
//! promotion is safe.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::version::VersionError;
use crate::domain::app::{App, AppUpdate};
use crate::domain::deployment::{DeploymentPlatform, PromoteOutcome};
use crate::domain::events::VersionEvent;
use crate::domain::repository::{AppRepository, VersionRepository};
use crate::domain::version::{Version, VersionId, VersionStatus, VersionUpdate};
use crate::infrastructure::event_bus::EventBus;

pub const PROMOTIONS_METRIC: &str = "appforge_promotions_total";

fn record_promotion(outcome: &'static str) {
    metrics::counter!(PROMOTIONS_METRIC, "outcome" => outcome).increment(1);
}

pub struct PromotionCoordinator {
    apps: Arc<dyn AppRepository>,
    versions: Arc<dyn VersionRepository>,
    platform: Arc<dyn DeploymentPlatform>,
    event_bus: EventBus,
}

impl PromotionCoordinator {
    pub fn new(
        apps: Arc<dyn AppRepository>,
        versions: Arc<dyn VersionRepository>,
        platform: Arc<dyn DeploymentPlatform>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            apps,
            versions,
            platform,
            event_bus,
        }
    }

    pub async fn promote(&self, version_id: VersionId) -> Result<Version, VersionError> {
        let version = self
            .versions
            .find_by_id(version_id)
            .await?
            .ok_or_else(|| VersionError::version_not_found(version_id))?;

        if version.status == VersionStatus::Promoted {
            return self.already_promoted(version).await;
        }

        if version.status != VersionStatus::Completed {
            record_promotion("rejected");
            return Err(VersionError::InvalidState(format!(
                "version {} is {}, only completed versions can be promoted",
                version.id, version.status
            )));
        }

        let deployment_id = match version.deployment_id() {
            Some(id) => id.to_string(),
            None => {
                record_promotion("rejected");
                return Err(VersionError::MissingDeployment(version.id));
            }
        };

        let app = self.owning_app(&version).await?;
        let project_id = match app.deployment_project_id.as_deref().filter(|p| !p.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                record_promotion("rejected");
                return Err(VersionError::MissingProject(app.id));
            }
        };

        let outcome = match self
            .platform
            .promote(&project_id, &deployment_id, &app.production_url)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(app_id = %app.id, version_id = %version.id, error = %e, "platform rejected promotion");
                record_promotion("platform_error");
                return Err(e.into());
            }
        };
        if outcome == PromoteOutcome::AlreadyProduction {
            info!(app_id = %app.id, version_id = %version.id, "deployment was already serving production");
        }

        self.apps
            .update(app.id, &AppUpdate::prod_version(version.version_number))
            .await?
            .ok_or_else(|| VersionError::app_not_found(app.id))?;

        let promoted = match self
            .versions
            .update_if_status(version.id, VersionStatus::Completed, &VersionUpdate::status(VersionStatus::Promoted))
            .await?
        {
            Some(promoted) => promoted,
            // Status moved while the platform call was in flight
            None => {
                let current = self
                    .versions
                    .find_by_id(version.id)
                    .await?
                    .ok_or_else(|| VersionError::version_not_found(version.id))?;
                if current.status == VersionStatus::Promoted {
                    return self.already_promoted(current).await;
                }
                record_promotion("rejected");
                return Err(VersionError::InvalidState(format!(
                    "version {} moved to {} during promotion",
                    current.id, current.status
                )));
            }
        };

        info!(
            app_id = %app.id,
            version_id = %promoted.id,
            version_number = promoted.version_number,
            production_url = %app.production_url,
            "version promoted"
        );
        record_promotion("promoted");
        self.event_bus.publish_version_event(VersionEvent::VersionPromoted {
            version_id: promoted.id,
            app_id: app.id,
            version_number: promoted.version_number,
            production_url: app.production_url.clone(),
            promoted_at: Utc::now(),
        });

        Ok(promoted)
    }

    async fn owning_app(&self, version: &Version) -> Result<App, VersionError> {
        self.apps
            .find_by_id(version.app_id)
            .await?
            .ok_or_else(|| VersionError::app_not_found(version.app_id))
    }

    async fn already_promoted(&self, version: Version) -> Result<Version, VersionError> {
        let app = self.owning_app(&version).await?;
        if app.prod_version == Some(version.version_number) {
            info!(app_id = %app.id, version_id = %version.id, "version already in production");
            record_promotion("unchanged");
            return Ok(version);
        }

        record_promotion("rejected");
        Err(VersionError::InvalidState(format!(
            "version {} was promoted but is no longer the production version",
            version.id
        )))
    }
}
