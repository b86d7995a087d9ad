// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Promote a completed version to production from the command line.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use uuid::Uuid;

use appforge_core::application::PromotionCoordinator;
use appforge_core::domain::service_config::ServiceConfigManifest;
use appforge_core::domain::version::VersionId;
use appforge_core::infrastructure::event_bus::EventBus;
use appforge_core::infrastructure::repositories::{PostgresAppRepository, PostgresVersionRepository};

use super::serve::{connect_database, vercel_client};

#[derive(Args)]
pub struct PromoteCommand {
    /// Version ID to promote
    #[arg(value_name = "VERSION_ID")]
    version_id: Uuid,
}

pub async fn execute(cmd: PromoteCommand, config: &ServiceConfigManifest) -> Result<()> {
    let spec = &config.spec;
    let database = connect_database(spec).await?;
    let pool = database.get_pool().clone();

    let coordinator = PromotionCoordinator::new(
        Arc::new(PostgresAppRepository::new(pool.clone())),
        Arc::new(PostgresVersionRepository::new(pool)),
        Arc::new(vercel_client(spec)?),
        EventBus::new(16),
    );

    let version = coordinator
        .promote(VersionId(cmd.version_id))
        .await
        .with_context(|| format!("Failed to promote version {}", cmd.version_id))?;

    println!(
        "{}",
        format!("✓ Version {} (#{}) is now in production", version.id, version.version_number).green()
    );

    Ok(())
}
