// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::domain::app::AppId;
use crate::domain::deployment::PlatformError;
use crate::domain::events::VersionEvent;
use crate::domain::repository::{AppRepository, RepositoryError, VersionRepository};
use crate::domain::version::{Version, VersionId, VersionStatus, VersionUpdate};
use crate::infrastructure::event_bus::EventBus;

/// Failures of the synchronous version and promotion use cases
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("version {0} has no deployment id")]
    MissingDeployment(VersionId),

    #[error("app {0} has no deployment project id")]
    MissingProject(AppId),

    #[error("no updatable fields supplied")]
    NoFields,

    #[error("deployment platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl VersionError {
    pub fn version_not_found(id: VersionId) -> Self {
        VersionError::NotFound(format!("version {}", id))
    }

    pub fn app_not_found(id: AppId) -> Self {
        VersionError::NotFound(format!("app {}", id))
    }
}

/// Lifecycle of build attempts: create, read, worker updates, delete.
pub struct VersionService {
    apps: Arc<dyn AppRepository>,
    versions: Arc<dyn VersionRepository>,
    event_bus: EventBus,
}

impl VersionService {
    pub fn new(apps: Arc<dyn AppRepository>, versions: Arc<dyn VersionRepository>, event_bus: EventBus) -> Self {
        Self {
            apps,
            versions,
            event_bus,
        }
    }

    pub async fn create_version(&self, app_id: AppId) -> Result<Version, VersionError> {
        if self.apps.find_by_id(app_id).await?.is_none() {
            return Err(VersionError::app_not_found(app_id));
        }

        let version = self.versions.create_next(app_id).await?;
        info!(app_id = %app_id, version_id = %version.id, version_number = version.version_number, "version created");

        self.event_bus.publish_version_event(VersionEvent::VersionCreated {
            version_id: version.id,
            app_id,
            version_number: version.version_number,
            created_at: version.created_at,
        });
        Ok(version)
    }

    pub async fn get_version(&self, id: VersionId) -> Result<Version, VersionError> {
        self.versions
            .find_by_id(id)
            .await?
            .ok_or_else(|| VersionError::version_not_found(id))
    }

    /// Versions of an app, highest number first
    pub async fn list_versions(&self, app_id: AppId) -> Result<Vec<Version>, VersionError> {
        Ok(self.versions.list_by_app(app_id).await?)
    }

    /// Merge a worker update. A status change must follow the version state
    /// machine and is written only if the status read for the check is still
    /// the stored one.
    pub async fn update_version(&self, id: VersionId, update: VersionUpdate) -> Result<Version, VersionError> {
        if update.is_empty() {
            return Err(VersionError::NoFields);
        }

        let mut expected = None;
        if let Some(next) = update.status {
            let current = self.get_version(id).await?;
            if !current.status.can_transition_to(next) {
                return Err(VersionError::InvalidState(format!(
                    "version {} cannot move from {} to {}",
                    id, current.status, next
                )));
            }
            if is_promotion_transition(current.status, next) {
                return Err(VersionError::InvalidState(format!(
                    "version {} can only be promoted through the promote operation",
                    id
                )));
            }
            expected = Some(current.status);
        }

        let written = match expected {
            Some(status) => self.versions.update_if_status(id, status, &update).await?,
            None => self.versions.update(id, &update).await?,
        };
        let version = match written {
            Some(version) => version,
            None => return Err(self.lost_write(id, expected).await),
        };

        if update.status.is_some() {
            info!(version_id = %id, status = %version.status, "version status updated");
        }
        self.event_bus.publish_version_event(VersionEvent::VersionUpdated {
            version_id: version.id,
            app_id: version.app_id,
            status: version.status,
            updated_at: Utc::now(),
        });
        Ok(version)
    }

    pub async fn delete_version(&self, id: VersionId) -> Result<(), VersionError> {
        if !self.versions.delete(id).await? {
            return Err(VersionError::version_not_found(id));
        }

        info!(version_id = %id, "version deleted");
        self.event_bus.publish_version_event(VersionEvent::VersionDeleted {
            version_id: id,
            deleted_at: Utc::now(),
        });
        Ok(())
    }

    /// Error for a guarded write that matched no row
    async fn lost_write(&self, id: VersionId, expected: Option<VersionStatus>) -> VersionError {
        match (self.versions.find_by_id(id).await, expected) {
            (Ok(Some(current)), Some(expected)) => VersionError::InvalidState(format!(
                "version {} moved from {} to {} during the update",
                id, expected, current.status
            )),
            (Err(e), _) => e.into(),
            _ => VersionError::version_not_found(id),
        }
    }
}

/// Status transitions only the promotion coordinator may write
fn is_promotion_transition(from: VersionStatus, to: VersionStatus) -> bool {
    from == VersionStatus::Completed && to == VersionStatus::Promoted
}
