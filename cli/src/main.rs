// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # appforge
//!
//! The `appforge` binary runs the RapidBuild provisioning service and offers
//! the operator commands around it.
//!
//! ## Commands
//!
//! - `appforge serve [--migrate]` - Run the HTTP API and setup pipeline
//! - `appforge migrate [--dry-run]` - Apply embedded schema migrations
//! - `appforge promote <VERSION_ID>` - Promote a completed version to production
//! - `appforge config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use appforge_core::domain::service_config::ServiceConfigManifest;

mod commands;

use commands::{ConfigCommand, MigrateCommand, PromoteCommand, ServeCommand};

/// appforge - App provisioning, versioning and promotion service
#[derive(Parser)]
#[command(name = "appforge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "APPFORGE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "APPFORGE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    #[command(name = "serve")]
    Serve {
        #[command(flatten)]
        command: ServeCommand,
    },

    /// Apply database migrations
    #[command(name = "migrate")]
    Migrate {
        #[command(flatten)]
        command: MigrateCommand,
    },

    /// Promote a completed version to production
    #[command(name = "promote")]
    Promote {
        #[command(flatten)]
        command: PromoteCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = ServiceConfigManifest::load_or_default(cli.config.clone());
    let log_format = config
        .as_ref()
        .map(|c| c.spec.observability.log_format.as_str())
        .unwrap_or("compact");
    init_logging(&cli.log_level, log_format)?;

    match cli.command {
        Some(Commands::Serve { command }) => {
            let config = config?;
            info!(node = %config.metadata.name, "Starting appforge");
            commands::serve::execute(command, config).await
        }
        Some(Commands::Migrate { command }) => commands::migrate::execute(command, &config?).await,
        Some(Commands::Promote { command }) => commands::promote::execute(command, &config?).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}
