// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Database Migrate Command
//!
//! `appforge migrate` applies the embedded schema migrations so the
//! `users`, `apps` and `versions` tables match this release.
//!
//! ```bash
//! # Apply all pending migrations
//! appforge migrate
//!
//! # Preview migrations without applying
//! appforge migrate --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use appforge_core::domain::service_config::ServiceConfigManifest;
use appforge_core::infrastructure::db::{Database, MIGRATOR};

use super::serve::connect_database;

#[derive(Args)]
pub struct MigrateCommand {
    /// List pending migrations without applying them
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(cmd: MigrateCommand, config: &ServiceConfigManifest) -> Result<()> {
    println!("{}", "appforge migrate".bold().green());

    println!("Connecting to database...");
    let database: Database = connect_database(&config.spec).await?;

    let applied_count = database.applied_migrations().await?;
    let total_migrations = MIGRATOR.iter().count();

    println!("Migration status: {} applied, {} total available.", applied_count, total_migrations);

    if applied_count >= total_migrations {
        println!("{}", "✓ Database is up to date.".green());
        return Ok(());
    }

    if cmd.dry_run {
        println!("Pending migrations found (Dry Run):");
        for migration in MIGRATOR.iter().skip(applied_count) {
            println!(" - {} {}", migration.version, migration.description);
        }
        println!("Skipping application due to --dry-run");
        return Ok(());
    }

    println!("Applying pending migrations...");
    let applied = database.migrate().await.context("Failed to apply migrations")?;
    println!("{}", format!("✓ Database updated successfully ({} applied).", applied).green());

    Ok(())
}
