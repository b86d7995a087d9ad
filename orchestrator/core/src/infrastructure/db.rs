// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that is
//! injected into every PostgreSQL repository implementation. Schema
//! migrations under `orchestrator/core/migrations` are embedded at compile time.

use anyhow::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Embedded schema migrations
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connection settings resolved from the service config's `database` section
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string)
            .await?;

        Ok(Self { pool })
    }

    /// Apply pending schema migrations. Returns the number of migrations run.
    pub async fn migrate(&self) -> Result<usize> {
        let before = self.applied_migrations().await?;
        MIGRATOR.run(&self.pool).await?;
        let after = self.applied_migrations().await?;
        Ok(after.saturating_sub(before))
    }

    /// Number of migrations recorded as applied. Zero on a fresh database.
    pub async fn applied_migrations(&self) -> Result<usize> {
        let count: Result<i64, sqlx::Error> =
            sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
                .fetch_one(&self.pool)
                .await;
        match count {
            Ok(count) => Ok(count as usize),
            // migrations table not created yet
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("42P01") => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}
