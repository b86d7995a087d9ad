// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository abstractions defined in
//! the domain layer, following the Repository pattern from DDD.
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresAppRepository** - `apps` table
//! - **PostgresVersionRepository** - `versions` table, numbered from `apps.last_version_number`
//! - **PostgresUserDirectory** - owner email lookup in `users`
//!
//! ## In-Memory Repositories
//!
//! HashMap-backed storage for tests and local development. The in-memory
//! app repository does not cascade into versions, and the version
//! repository keeps its own per-app high-water marks.

pub mod postgres_app;
pub mod postgres_user;
pub mod postgres_version;

pub use postgres_app::PostgresAppRepository;
pub use postgres_user::PostgresUserDirectory;
pub use postgres_version::PostgresVersionRepository;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::app::{App, AppId, AppUpdate};
use crate::domain::repository::{AppRepository, RepositoryError, UserDirectory, VersionRepository};
use crate::domain::version::{next_version_number, Version, VersionId, VersionStatus, VersionUpdate};

#[derive(Clone, Default)]
pub struct InMemoryAppRepository {
    apps: Arc<RwLock<HashMap<AppId, App>>>,
}

impl InMemoryAppRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppRepository for InMemoryAppRepository {
    async fn insert(&self, app: &App) -> Result<(), RepositoryError> {
        let mut apps = self.apps.write();
        if apps.contains_key(&app.id) {
            return Err(RepositoryError::Conflict(format!("app {} already exists", app.id)));
        }
        apps.insert(app.id, app.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AppId) -> Result<Option<App>, RepositoryError> {
        Ok(self.apps.read().get(&id).cloned())
    }

    async fn find_owned(&self, id: AppId, user_id: &str) -> Result<Option<App>, RepositoryError> {
        Ok(self.apps.read().get(&id).filter(|app| app.user_id == user_id).cloned())
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<App>, RepositoryError> {
        let apps = self.apps.read();
        let mut owned: Vec<App> = apps.values().filter(|a| a.user_id == user_id).cloned().collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update(&self, id: AppId, update: &AppUpdate) -> Result<Option<App>, RepositoryError> {
        let mut apps = self.apps.write();
        Ok(apps.get_mut(&id).map(|app| {
            app.apply(update);
            app.clone()
        }))
    }

    async fn update_owned(
        &self,
        id: AppId,
        user_id: &str,
        update: &AppUpdate,
    ) -> Result<Option<App>, RepositoryError> {
        let mut apps = self.apps.write();
        Ok(apps.get_mut(&id).filter(|app| app.user_id == user_id).map(|app| {
            app.apply(update);
            app.clone()
        }))
    }

    async fn delete(&self, id: AppId, user_id: &str) -> Result<bool, RepositoryError> {
        let mut apps = self.apps.write();
        if !apps.get(&id).is_some_and(|app| app.user_id == user_id) {
            return Ok(false);
        }
        Ok(apps.remove(&id).is_some())
    }
}

#[derive(Default)]
struct VersionTable {
    rows: HashMap<VersionId, Version>,
    last_numbers: HashMap<AppId, i32>,
}

#[derive(Clone, Default)]
pub struct InMemoryVersionRepository {
    table: Arc<RwLock<VersionTable>>,
}

impl InMemoryVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionRepository for InMemoryVersionRepository {
    async fn create_next(&self, app_id: AppId) -> Result<Version, RepositoryError> {
        // Numbering and insert share one write guard
        let mut table = self.table.write();
        let last = table.last_numbers.entry(app_id).or_insert(0);
        *last = next_version_number(*last);
        let version = Version::new(app_id, *last);
        table.rows.insert(version.id, version.clone());
        Ok(version)
    }

    async fn find_by_id(&self, id: VersionId) -> Result<Option<Version>, RepositoryError> {
        Ok(self.table.read().rows.get(&id).cloned())
    }

    async fn list_by_app(&self, app_id: AppId) -> Result<Vec<Version>, RepositoryError> {
        let table = self.table.read();
        let mut list: Vec<Version> = table.rows.values().filter(|v| v.app_id == app_id).cloned().collect();
        list.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(list)
    }

    async fn update(&self, id: VersionId, update: &VersionUpdate) -> Result<Option<Version>, RepositoryError> {
        let mut table = self.table.write();
        Ok(table.rows.get_mut(&id).map(|version| {
            version.apply(update);
            version.clone()
        }))
    }

    async fn update_if_status(
        &self,
        id: VersionId,
        expected: VersionStatus,
        update: &VersionUpdate,
    ) -> Result<Option<Version>, RepositoryError> {
        let mut table = self.table.write();
        Ok(table.rows.get_mut(&id).filter(|v| v.status == expected).map(|version| {
            version.apply(update);
            version.clone()
        }))
    }

    async fn delete(&self, id: VersionId) -> Result<bool, RepositoryError> {
        Ok(self.table.write().rows.remove(&id).is_some())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    emails: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: impl Into<String>, email: impl Into<String>) -> Self {
        self.emails.write().insert(user_id.into(), email.into());
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn owner_email(&self, user_id: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.emails.read().get(user_id).cloned())
    }
}
