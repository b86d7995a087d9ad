// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Version Repository
//!
//! `VersionRepository` backed by the `versions` table.
//!
//! Version numbers come from the app row's `last_version_number` high-water
//! mark, bumped with `UPDATE ... RETURNING` inside the insert transaction.
//! The row lock taken by that update queues concurrent creations for one
//! app, and deleted numbers are never handed out again. The
//! `UNIQUE (app_id, version_number)` constraint backs this up.
//!
//! Status writes from the state machine go through `update_if_status`, which
//! adds the expected status to the `WHERE` clause.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::app::AppId;
use crate::domain::repository::{RepositoryError, VersionRepository};
use crate::domain::version::{Version, VersionId, VersionStatus, VersionUpdate};

const VERSION_COLUMNS: &str = "id, app_id, version_number, status, code_path, deployment_url, \
     deployment_id, build_log, error_message, created_at";

pub struct PostgresVersionRepository {
    pool: PgPool,
}

impl PostgresVersionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// COALESCE update, optionally guarded by the current status
    async fn update_where(
        &self,
        id: VersionId,
        expected: Option<VersionStatus>,
        update: &VersionUpdate,
    ) -> Result<Option<Version>, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE versions SET
                status = COALESCE($2, status),
                code_path = COALESCE($3, code_path),
                deployment_url = COALESCE($4, deployment_url),
                deployment_id = COALESCE($5, deployment_id),
                build_log = COALESCE($6, build_log),
                error_message = COALESCE($7, error_message)
            WHERE id = $1 AND ($8::text IS NULL OR status = $8)
            RETURNING {}
            "#,
            VERSION_COLUMNS
        ))
        .bind(id.0)
        .bind(update.status.map(|s| s.as_str()))
        .bind(&update.code_path)
        .bind(&update.deployment_url)
        .bind(&update.deployment_id)
        .bind(&update.build_log)
        .bind(&update.error_message)
        .bind(expected.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_version).transpose()
    }
}

fn row_to_version(row: &PgRow) -> Result<Version, RepositoryError> {
    let status: String = row.get("status");
    let status = VersionStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Database(format!("unknown version status '{}'", status)))?;

    Ok(Version {
        id: VersionId(row.get("id")),
        app_id: AppId(row.get("app_id")),
        version_number: row.get("version_number"),
        status,
        code_path: row.get("code_path"),
        deployment_url: row.get("deployment_url"),
        deployment_id: row.get("deployment_id"),
        build_log: row.get("build_log"),
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl VersionRepository for PostgresVersionRepository {
    async fn create_next(&self, app_id: AppId) -> Result<Version, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let next: i32 = sqlx::query_scalar(
            r#"
            UPDATE apps SET last_version_number = last_version_number + 1
            WHERE id = $1
            RETURNING last_version_number
            "#,
        )
        .bind(app_id.0)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("app {}", app_id)))?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO versions (id, app_id, version_number, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            VERSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(app_id.0)
        .bind(next)
        .bind(VersionStatus::Pending.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let version = row_to_version(&row)?;
        tx.commit().await?;

        Ok(version)
    }

    async fn find_by_id(&self, id: VersionId) -> Result<Option<Version>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM versions WHERE id = $1", VERSION_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_version).transpose()
    }

    async fn list_by_app(&self, app_id: AppId) -> Result<Vec<Version>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM versions WHERE app_id = $1 ORDER BY version_number DESC",
            VERSION_COLUMNS
        ))
        .bind(app_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_version).collect()
    }

    async fn update(&self, id: VersionId, update: &VersionUpdate) -> Result<Option<Version>, RepositoryError> {
        self.update_where(id, None, update).await
    }

    async fn update_if_status(
        &self,
        id: VersionId,
        expected: VersionStatus,
        update: &VersionUpdate,
    ) -> Result<Option<Version>, RepositoryError> {
        self.update_where(id, Some(expected), update).await
    }

    async fn delete(&self, id: VersionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM versions WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
