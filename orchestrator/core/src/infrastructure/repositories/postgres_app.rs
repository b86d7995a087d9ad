// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL App Repository
//!
//! `AppRepository` backed by the `apps` table. Partial updates are a single
//! `UPDATE ... SET col = COALESCE($n, col)` so each writer only touches the
//! columns present in its `AppUpdate`. Owner-scoped reads and writes add
//! `user_id` to the `WHERE` clause, so a foreign app looks absent.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::app::{App, AppCategory, AppId, AppStatus, AppUpdate, ColorScheme};
use crate::domain::repository::{AppRepository, RepositoryError};

const APP_COLUMNS: &str = "id, user_id, name, display_name, description, category, color_scheme, \
     logo, status, production_url, prod_version, deployment_project_id, created_at, updated_at";

pub struct PostgresAppRepository {
    pool: PgPool,
}

impl PostgresAppRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// COALESCE update, optionally restricted to one owner
    async fn update_where(
        &self,
        id: AppId,
        owner: Option<&str>,
        update: &AppUpdate,
    ) -> Result<Option<App>, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE apps SET
                name = COALESCE($2, name),
                display_name = COALESCE($3, display_name),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                color_scheme = COALESCE($6, color_scheme),
                logo = COALESCE($7, logo),
                status = COALESCE($8, status),
                production_url = COALESCE($9, production_url),
                prod_version = COALESCE($10, prod_version),
                deployment_project_id = COALESCE($11, deployment_project_id),
                updated_at = NOW()
            WHERE id = $1 AND ($12::text IS NULL OR user_id = $12)
            RETURNING {}
            "#,
            APP_COLUMNS
        ))
        .bind(id.0)
        .bind(&update.name)
        .bind(&update.display_name)
        .bind(&update.description)
        .bind(update.category.map(|c| c.as_str()))
        .bind(update.color_scheme.map(|c| c.as_str()))
        .bind(&update.logo)
        .bind(update.status.map(|s| s.as_str()))
        .bind(&update.production_url)
        .bind(update.prod_version)
        .bind(&update.deployment_project_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_app))
    }
}

fn row_to_app(row: &PgRow) -> App {
    let category: String = row.get("category");
    let color_scheme: String = row.get("color_scheme");
    let status: String = row.get("status");

    App {
        id: AppId(row.get("id")),
        user_id: row.get("user_id"),
        name: row.get("name"),
        display_name: row.get("display_name"),
        description: row.get("description"),
        category: AppCategory::parse_lossy(&category),
        color_scheme: ColorScheme::parse_lossy(&color_scheme),
        logo: row.get("logo"),
        status: AppStatus::parse_lossy(&status),
        production_url: row.get("production_url"),
        prod_version: row.get("prod_version"),
        deployment_project_id: row.get("deployment_project_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl AppRepository for PostgresAppRepository {
    async fn insert(&self, app: &App) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO apps (
                id, user_id, name, display_name, description, category, color_scheme,
                logo, status, production_url, prod_version, deployment_project_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(app.id.0)
        .bind(&app.user_id)
        .bind(&app.name)
        .bind(&app.display_name)
        .bind(&app.description)
        .bind(app.category.as_str())
        .bind(app.color_scheme.as_str())
        .bind(&app.logo)
        .bind(app.status.as_str())
        .bind(&app.production_url)
        .bind(app.prod_version)
        .bind(&app.deployment_project_id)
        .bind(app.created_at)
        .bind(app.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: AppId) -> Result<Option<App>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM apps WHERE id = $1", APP_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_app))
    }

    async fn find_owned(&self, id: AppId, user_id: &str) -> Result<Option<App>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM apps WHERE id = $1 AND user_id = $2",
            APP_COLUMNS
        ))
        .bind(id.0)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_app))
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<App>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM apps WHERE user_id = $1 ORDER BY created_at DESC",
            APP_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_app).collect())
    }

    async fn update(&self, id: AppId, update: &AppUpdate) -> Result<Option<App>, RepositoryError> {
        self.update_where(id, None, update).await
    }

    async fn update_owned(
        &self,
        id: AppId,
        user_id: &str,
        update: &AppUpdate,
    ) -> Result<Option<App>, RepositoryError> {
        self.update_where(id, Some(user_id), update).await
    }

    async fn delete(&self, id: AppId, user_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM apps WHERE id = $1 AND user_id = $2")
            .bind(id.0)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
