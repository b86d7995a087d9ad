// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use appforge_core::domain::service_config::ServiceConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with every default filled in
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./appforge-config.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

fn secret_state(value: &Option<String>) -> String {
    match value.as_deref() {
        None => "(not set)".dimmed().to_string(),
        Some(v) if v.starts_with("env:") => v.to_string(),
        Some(_) => "(inline)".to_string(),
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ServiceConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. APPFORGE_CONFIG_PATH: {}",
            std::env::var("APPFORGE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./appforge-config.yaml");
        println!("  4. ~/.appforge/config.yaml");
        println!("  5. /etc/appforge/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();
    println!("  Node: {}", config.metadata.name);
    println!("  Platform domain: {}", spec.platform_domain);
    println!("  Listen: {}:{}", spec.server.bind_address, spec.server.port);
    println!("  Database: {}", secret_state(&spec.database.url));
    println!();

    println!("{}", "Collaborators:".bold());
    println!("  Gemini: {} ({}) key {}", spec.gemini.endpoint, spec.gemini.model, secret_state(&spec.gemini.api_key));
    println!("  Runware: {} ({}) key {}", spec.runware.endpoint, spec.runware.model, secret_state(&spec.runware.api_key));
    println!("  Registry: {} (timeout {}s)", spec.registry.binary, spec.registry.timeout_secs);
    println!("  Object store: {} -> {}", spec.object_store.bucket, spec.object_store.public_base_url());
    println!("  Vercel: {} token {}", spec.vercel.api_base, secret_state(&spec.vercel.token));
    println!();

    println!("{}", "Observability:".bold());
    println!("  Log format: {}", spec.observability.log_format);
    match spec.observability.metrics_port {
        Some(port) => println!("  Metrics: :{}", port),
        None => println!("  Metrics: {}", "(disabled)".dimmed()),
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ServiceConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    let sample = ServiceConfigManifest::default().to_yaml_string()?;

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}
