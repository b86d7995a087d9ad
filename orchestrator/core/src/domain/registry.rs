// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # App Registry Capability
//!
//! The secondary document-database record for each application is managed by
//! an external tool. The registry only mirrors a subset of fields (name, owner
//! email, logo) and is allowed to lag behind the relational store: every sync
//! is best-effort and the next sync carries the latest values again.
//!
//! Callers must log a `RegistrySyncError` and move on. It is never
//! propagated to a request and never retried.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::domain::app::AppId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// First sync after the brand name is resolved
    Create,
    /// Any later sync (logo attached, user rename)
    Update,
}

impl SyncMode {
    pub fn as_arg(&self) -> &'static str {
        match self {
            SyncMode::Create => "create",
            SyncMode::Update => "update",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySyncRequest {
    pub mode: SyncMode,
    pub app_id: AppId,
    pub name: String,
    pub owner_email: Option<String>,
    pub logo: Option<String>,
}

impl RegistrySyncRequest {
    pub fn create(app_id: AppId, name: impl Into<String>, owner_email: impl Into<String>) -> Self {
        Self {
            mode: SyncMode::Create,
            app_id,
            name: name.into(),
            owner_email: Some(owner_email.into()),
            logo: None,
        }
    }

    pub fn update(app_id: AppId, name: impl Into<String>, logo: Option<String>) -> Self {
        Self {
            mode: SyncMode::Update,
            app_id,
            name: name.into(),
            owner_email: None,
            logo,
        }
    }
}

#[async_trait]
pub trait AppRegistry: Send + Sync {
    async fn sync(&self, request: &RegistrySyncRequest) -> Result<(), RegistrySyncError>;
}

#[derive(Debug, Error)]
pub enum RegistrySyncError {
    #[error("failed to launch registry command: {0}")]
    Launch(String),

    #[error("registry command exited with {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("registry command timed out after {0}s")]
    Timeout(u64),

    #[error("registry rejected sync: {0}")]
    Rejected(String),
}
