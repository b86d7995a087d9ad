// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use crate::domain::app::{AppCategory, AppId, ColorScheme};
use crate::domain::version::{VersionId, VersionStatus};

/// Setup pipeline progress for one application.
///
/// Every stage outcome is published, including failures, so observers can
/// follow a pipeline that never reports back to the request that started it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SetupEvent {
    AppCreated {
        app_id: AppId,
        production_url: String,
        created_at: DateTime<Utc>,
    },
    ConfigResolved {
        app_id: AppId,
        app_name: String,
        category: AppCategory,
        color_scheme: ColorScheme,
        used_fallback: bool,
        persisted: bool,
        resolved_at: DateTime<Utc>,
    },
    RegistrySynced {
        app_id: AppId,
        mode: String, // "create" or "update"
        synced_at: DateTime<Utc>,
    },
    RegistrySyncFailed {
        app_id: AppId,
        mode: String,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    LogoAttached {
        app_id: AppId,
        logo_url: String,
        attached_at: DateTime<Utc>,
    },
    AssetGenerationFailed {
        app_id: AppId,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    /// The asset stage has finished, successfully or not. Last event of a pipeline.
    SetupCompleted {
        app_id: AppId,
        completed_at: DateTime<Utc>,
    },
}

impl SetupEvent {
    pub fn app_id(&self) -> AppId {
        match self {
            SetupEvent::AppCreated { app_id, .. }
            | SetupEvent::ConfigResolved { app_id, .. }
            | SetupEvent::RegistrySynced { app_id, .. }
            | SetupEvent::RegistrySyncFailed { app_id, .. }
            | SetupEvent::LogoAttached { app_id, .. }
            | SetupEvent::AssetGenerationFailed { app_id, .. }
            | SetupEvent::SetupCompleted { app_id, .. } => *app_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VersionEvent {
    VersionCreated {
        version_id: VersionId,
        app_id: AppId,
        version_number: i32,
        created_at: DateTime<Utc>,
    },
    VersionUpdated {
        version_id: VersionId,
        app_id: AppId,
        status: VersionStatus,
        updated_at: DateTime<Utc>,
    },
    VersionDeleted {
        version_id: VersionId,
        deleted_at: DateTime<Utc>,
    },
    VersionPromoted {
        version_id: VersionId,
        app_id: AppId,
        version_number: i32,
        production_url: String,
        promoted_at: DateTime<Utc>,
    },
}
