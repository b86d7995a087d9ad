// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root: one repository per
//! aggregate, interface defined in the domain layer, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `AppRepository` | `App` | `InMemoryAppRepository`, `PostgresAppRepository` |
//! | `VersionRepository` | `Version` | `InMemoryVersionRepository`, `PostgresVersionRepository` |
//! | `UserDirectory` | owner lookup | `InMemoryUserDirectory`, `PostgresUserDirectory` |
//!
//! Updates take allow-listed partial structs (`AppUpdate`, `VersionUpdate`)
//! rather than whole aggregates, so independent writers only touch the
//! columns they own.

use async_trait::async_trait;
use crate::domain::app::{App, AppId, AppUpdate};
use crate::domain::version::{Version, VersionId, VersionStatus, VersionUpdate};

/// Repository interface for App aggregates
#[async_trait]
pub trait AppRepository: Send + Sync {
    /// Insert a newly created app
    async fn insert(&self, app: &App) -> Result<(), RepositoryError>;

    /// Find app by ID
    async fn find_by_id(&self, id: AppId) -> Result<Option<App>, RepositoryError>;

    /// Find app by ID, `None` unless it belongs to `user_id`
    async fn find_owned(&self, id: AppId, user_id: &str) -> Result<Option<App>, RepositoryError>;

    /// List apps owned by a user, newest first
    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<App>, RepositoryError>;

    /// Apply a partial update and return the updated row, `None` if no row matched
    async fn update(&self, id: AppId, update: &AppUpdate) -> Result<Option<App>, RepositoryError>;

    /// Owner-scoped `update`. Rows owned by someone else do not match.
    async fn update_owned(
        &self,
        id: AppId,
        user_id: &str,
        update: &AppUpdate,
    ) -> Result<Option<App>, RepositoryError>;

    /// Delete an app owned by `user_id` (versions cascade). Returns whether
    /// a row was removed.
    async fn delete(&self, id: AppId, user_id: &str) -> Result<bool, RepositoryError>;
}

/// Repository interface for Version aggregates
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Insert a `pending` version numbered one past the highest number ever
    /// issued for the app, deleted versions included. Implementations must
    /// serialize concurrent calls for the same app. Backends that track apps
    /// fail with `NotFound` when the app does not exist.
    async fn create_next(&self, app_id: AppId) -> Result<Version, RepositoryError>;

    /// Find version by ID
    async fn find_by_id(&self, id: VersionId) -> Result<Option<Version>, RepositoryError>;

    /// All versions of an app, highest version number first
    async fn list_by_app(&self, app_id: AppId) -> Result<Vec<Version>, RepositoryError>;

    /// Apply a partial update and return the updated row, `None` if no row matched
    async fn update(&self, id: VersionId, update: &VersionUpdate) -> Result<Option<Version>, RepositoryError>;

    /// Compare-and-set variant of `update`: applies only while the stored
    /// status still equals `expected`. `None` if the row is missing or its
    /// status has moved on.
    async fn update_if_status(
        &self,
        id: VersionId,
        expected: VersionStatus,
        update: &VersionUpdate,
    ) -> Result<Option<Version>, RepositoryError>;

    /// Delete a single version. Returns whether a row was removed.
    async fn delete(&self, id: VersionId) -> Result<bool, RepositoryError>;
}

/// Read-only lookup of account details owned by the auth system.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn owner_email(&self, user_id: &str) -> Result<Option<String>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::Conflict(db_err.message().to_string())
            }
            other => RepositoryError::Database(other.to_string()),
        }
    }
}
