// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Defines the configuration schema for an appforge service node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP server and database settings
// - External collaborators (AI endpoint, image generation, registry CLI,
//   object store, deployment platform)
// - Observability settings
//
// Secrets accept "env:VAR_NAME" references, resolved when clients are built.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::domain_name::DEFAULT_PLATFORM_DOMAIN;

pub const API_VERSION: &str = "appforge.100monkeys.ai/v1";
pub const KIND: &str = "ServiceConfig";

/// Top-level Kubernetes-style service configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigManifest {
    /// API version (must be "appforge.100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ServiceConfig")
    pub kind: String,

    /// Node metadata
    pub metadata: ManifestMetadata,

    /// Service configuration specification
    #[serde(default)]
    pub spec: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Service configuration specification (content under spec:)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Domain production hostnames are minted under
    #[serde(default = "default_platform_domain")]
    pub platform_domain: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub runware: RunwareConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub object_store: ObjectStoreConfig,

    #[serde(default)]
    pub vercel: VercelConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API key (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunwareConfig {
    #[serde(default = "default_runware_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_runware_model")]
    pub model: String,

    /// API key (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry management executable
    #[serde(default = "default_registry_binary")]
    pub binary: String,

    /// Replaces PATH for the child process when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_override: Option<String>,

    #[serde(default = "default_registry_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    #[serde(default)]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom S3-compatible endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Base of public object URLs, defaults to https://{bucket}.s3.amazonaws.com
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VercelConfig {
    #[serde(default = "default_vercel_api_base")]
    pub api_base: String,

    /// Bearer token (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Prometheus exporter port; exporter disabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

fn default_platform_domain() -> String {
    DEFAULT_PLATFORM_DOMAIN.to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    5
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_runware_endpoint() -> String {
    "https://api.runware.ai/v1".to_string()
}

fn default_runware_model() -> String {
    "runware:100@1".to_string()
}

fn default_registry_binary() -> String {
    "app-manager".to_string()
}

fn default_registry_timeout() -> u64 {
    60
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_vercel_api_base() -> String {
    "https://api.vercel.com".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_gemini_endpoint(),
            model: default_gemini_model(),
            api_key: None,
        }
    }
}

impl Default for RunwareConfig {
    fn default() -> Self {
        Self {
            endpoint: default_runware_endpoint(),
            model: default_runware_model(),
            api_key: None,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            binary: default_registry_binary(),
            path_override: None,
            timeout_secs: default_registry_timeout(),
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            public_base_url: None,
        }
    }
}

impl ObjectStoreConfig {
    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", self.bucket))
    }
}

impl Default for VercelConfig {
    fn default() -> Self {
        Self {
            api_base: default_vercel_api_base(),
            token: None,
            team_id: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            metrics_port: None,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            platform_domain: default_platform_domain(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            gemini: GeminiConfig::default(),
            runware: RunwareConfig::default(),
            registry: RegistryConfig::default(),
            object_store: ObjectStoreConfig::default(),
            vercel: VercelConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for ServiceConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "appforge-node".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
            },
            spec: ServiceConfig::default(),
        }
    }
}

/// Resolve a secret value (supports "env:VAR_NAME" syntax)
pub fn resolve_secret(value: &Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(v) => match v.strip_prefix("env:") {
            Some(var_name) => std::env::var(var_name)
                .map(Some)
                .map_err(|_| ConfigError::MissingEnv(var_name.to_string())),
            None => Ok(Some(v.clone())),
        },
        None => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not set: {0}")]
    MissingEnv(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ServiceConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. APPFORGE_CONFIG_PATH environment variable
    /// 2. ./appforge-config.yaml (working directory)
    /// 3. ~/.appforge/config.yaml (user home)
    /// 4. /etc/appforge/config.yaml
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("APPFORGE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./appforge-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".appforge").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/appforge/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("APPFORGE_DATABASE_URL") {
            tracing::info!("Environment override: APPFORGE_DATABASE_URL");
            self.spec.database.url = Some(url);
        }

        if let Ok(port) = std::env::var("APPFORGE_PORT") {
            match port.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: APPFORGE_PORT={}", port);
                    self.spec.server.port = port;
                }
                Err(_) => {
                    tracing::warn!("Invalid value for APPFORGE_PORT: '{}'. Ignoring.", port);
                }
            }
        }

        if let Ok(domain) = std::env::var("APPFORGE_PLATFORM_DOMAIN") {
            tracing::info!("Environment override: APPFORGE_PLATFORM_DOMAIN={}", domain);
            self.spec.platform_domain = domain;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version != API_VERSION {
            return Err(ConfigError::Invalid(format!(
                "apiVersion '{}' must be '{}'",
                self.api_version, API_VERSION
            )));
        }

        if self.kind != KIND {
            return Err(ConfigError::Invalid(format!("kind '{}' must be '{}'", self.kind, KIND)));
        }

        if self.metadata.name.is_empty() {
            return Err(ConfigError::Invalid("metadata.name cannot be empty".to_string()));
        }

        let spec = &self.spec;
        if spec.platform_domain.is_empty() || spec.platform_domain.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "platform_domain '{}' is not a domain",
                spec.platform_domain
            )));
        }

        if spec.database.url.is_none() {
            return Err(ConfigError::MissingSetting("database.url"));
        }
        if spec.gemini.api_key.is_none() {
            return Err(ConfigError::MissingSetting("gemini.api_key"));
        }
        if spec.runware.api_key.is_none() {
            return Err(ConfigError::MissingSetting("runware.api_key"));
        }
        if spec.vercel.token.is_none() {
            return Err(ConfigError::MissingSetting("vercel.token"));
        }
        if spec.object_store.bucket.is_empty() {
            return Err(ConfigError::MissingSetting("object_store.bucket"));
        }
        if spec.registry.binary.is_empty() {
            return Err(ConfigError::MissingSetting("registry.binary"));
        }

        Ok(())
    }
}
