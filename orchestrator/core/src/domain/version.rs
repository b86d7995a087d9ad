// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Version Aggregate
//!
//! One build attempt of an application. Versions are numbered per
//! application from a high-water mark kept on the app row, so numbers are
//! never reused, even after the newest version is deleted.
//!
//! ```text
//! pending ──▶ building ──▶ completed ──▶ promoted
//!                 │
//!                 └──────▶ error
//! ```
//!
//! `error` and `promoted` are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::app::AppId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub Uuid);

impl VersionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Pending,
    Building,
    Completed,
    Error,
    Promoted,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Pending => "pending",
            VersionStatus::Building => "building",
            VersionStatus::Completed => "completed",
            VersionStatus::Error => "error",
            VersionStatus::Promoted => "promoted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(VersionStatus::Pending),
            "building" => Some(VersionStatus::Building),
            "completed" => Some(VersionStatus::Completed),
            "error" => Some(VersionStatus::Error),
            "promoted" => Some(VersionStatus::Promoted),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VersionStatus::Error | VersionStatus::Promoted)
    }

    /// Whether a write moving a version from `self` to `next` is legal.
    /// Re-writing the current status is accepted so that build workers can
    /// resend it alongside log updates.
    pub fn can_transition_to(&self, next: VersionStatus) -> bool {
        use VersionStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Building)
                | (Pending, Error)
                | (Building, Completed)
                | (Building, Error)
                | (Completed, Promoted)
        )
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub app_id: AppId,
    pub version_number: i32,
    pub status: VersionStatus,
    pub code_path: Option<String>,
    pub deployment_url: Option<String>,
    pub deployment_id: Option<String>,
    pub build_log: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Version {
    pub fn new(app_id: AppId, version_number: i32) -> Self {
        Self {
            id: VersionId::new(),
            app_id,
            version_number,
            status: VersionStatus::Pending,
            code_path: None,
            deployment_url: None,
            deployment_id: None,
            build_log: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Deployment build id, if present and non-empty.
    pub fn deployment_id(&self) -> Option<&str> {
        self.deployment_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn apply(&mut self, update: &VersionUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(code_path) = &update.code_path {
            self.code_path = Some(code_path.clone());
        }
        if let Some(url) = &update.deployment_url {
            self.deployment_url = Some(url.clone());
        }
        if let Some(deployment_id) = &update.deployment_id {
            self.deployment_id = Some(deployment_id.clone());
        }
        if let Some(build_log) = &update.build_log {
            self.build_log = Some(build_log.clone());
        }
        if let Some(error_message) = &update.error_message {
            self.error_message = Some(error_message.clone());
        }
    }
}

/// Next number in an application's version sequence, given the highest
/// number ever issued for it (0 for a fresh app).
pub fn next_version_number(last_issued: i32) -> i32 {
    last_issued + 1
}

/// Allow-listed partial update of a `Version`. Only these columns can be
/// written after creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionUpdate {
    pub status: Option<VersionStatus>,
    pub code_path: Option<String>,
    pub deployment_url: Option<String>,
    pub deployment_id: Option<String>,
    pub build_log: Option<String>,
    pub error_message: Option<String>,
}

impl VersionUpdate {
    pub fn status(status: VersionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
