// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Aggregate
//!
//! An `App` is a user-owned project tracked across the relational store, the
//! secondary document registry and the deployment platform.
//!
//! Mutation sources are deliberately narrow:
//!
//! | Source | Fields |
//! |--------|--------|
//! | creation | everything, with placeholder brand fields |
//! | AI config stage | name, display name, category, color scheme, hostname |
//! | asset stage | logo |
//! | user update | name, display name, description, status, project id |
//! | promotion | production version pointer |
//!
//! Each source writes through an [`AppUpdate`] carrying only its own fields,
//! so concurrent stages never clobber each other's columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::domain_name::production_domain;

pub const PLACEHOLDER_NAME: &str = "MyApp";
pub const PLACEHOLDER_DISPLAY_NAME: &str = "My App";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub Uuid);

impl AppId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AppId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppCategory {
    Productivity,
    Social,
    Ecommerce,
    Content,
    Dashboard,
    #[default]
    Other,
}

impl AppCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppCategory::Productivity => "productivity",
            AppCategory::Social => "social",
            AppCategory::Ecommerce => "ecommerce",
            AppCategory::Content => "content",
            AppCategory::Dashboard => "dashboard",
            AppCategory::Other => "other",
        }
    }

    /// Parse a stored or model-provided value; anything unrecognised is `Other`.
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "productivity" => AppCategory::Productivity,
            "social" => AppCategory::Social,
            "ecommerce" => AppCategory::Ecommerce,
            "content" => AppCategory::Content,
            "dashboard" => AppCategory::Dashboard,
            _ => AppCategory::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Blue,
    Green,
    Purple,
    Orange,
    Red,
    Teal,
    Indigo,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Blue => "blue",
            ColorScheme::Green => "green",
            ColorScheme::Purple => "purple",
            ColorScheme::Orange => "orange",
            ColorScheme::Red => "red",
            ColorScheme::Teal => "teal",
            ColorScheme::Indigo => "indigo",
        }
    }

    /// Parse a stored or model-provided value; anything unrecognised is `Blue`.
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "green" => ColorScheme::Green,
            "purple" => ColorScheme::Purple,
            "orange" => ColorScheme::Orange,
            "red" => ColorScheme::Red,
            "teal" => ColorScheme::Teal,
            "indigo" => ColorScheme::Indigo,
            _ => ColorScheme::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Building,
    Ready,
    Error,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Building => "building",
            AppStatus::Ready => "ready",
            AppStatus::Error => "error",
        }
    }

    pub fn parse_lossy(value: &str) -> Self {
        match value {
            "ready" => AppStatus::Ready,
            "error" => AppStatus::Error,
            _ => AppStatus::Building,
        }
    }
}

/// Brand configuration resolved for an application, either extracted from
/// its description by the AI endpoint or the fixed fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub app_name: String,
    pub display_name: String,
    pub requires_auth: bool,
    pub allow_signup: bool,
    pub category: AppCategory,
    pub keywords: Vec<String>,
    pub color_scheme: ColorScheme,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: PLACEHOLDER_NAME.to_string(),
            display_name: PLACEHOLDER_DISPLAY_NAME.to_string(),
            requires_auth: true,
            allow_signup: true,
            category: AppCategory::Other,
            keywords: vec!["app".to_string()],
            color_scheme: ColorScheme::Blue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
    pub user_id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: AppCategory,
    pub color_scheme: ColorScheme,
    pub logo: Option<String>,
    pub status: AppStatus,
    pub production_url: String,
    pub prod_version: Option<i32>,
    pub deployment_project_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl App {
    /// Build the record inserted synchronously on creation: placeholder brand
    /// fields, `building` status, and a hostname derived from the placeholder.
    pub fn provisional(user_id: impl Into<String>, description: impl Into<String>, platform_domain: &str) -> Self {
        let id = AppId::new();
        let now = Utc::now();
        Self {
            id,
            user_id: user_id.into(),
            name: PLACEHOLDER_NAME.to_string(),
            display_name: PLACEHOLDER_DISPLAY_NAME.to_string(),
            description: description.into(),
            category: AppCategory::Other,
            color_scheme: ColorScheme::Blue,
            logo: None,
            status: AppStatus::Building,
            production_url: production_domain(PLACEHOLDER_NAME, &id.to_string(), platform_domain),
            prod_version: None,
            deployment_project_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place. Untouched fields keep their values.
    pub fn apply(&mut self, update: &AppUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(display_name) = &update.display_name {
            self.display_name = display_name.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(color_scheme) = update.color_scheme {
            self.color_scheme = color_scheme;
        }
        if let Some(logo) = &update.logo {
            self.logo = Some(logo.clone());
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(production_url) = &update.production_url {
            self.production_url = production_url.clone();
        }
        if let Some(prod_version) = update.prod_version {
            self.prod_version = Some(prod_version);
        }
        if let Some(project_id) = &update.deployment_project_id {
            self.deployment_project_id = Some(project_id.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Sparse set of changes to an `App` row. One optional field per column that
/// may be written after creation; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<AppCategory>,
    pub color_scheme: Option<ColorScheme>,
    pub logo: Option<String>,
    pub status: Option<AppStatus>,
    pub production_url: Option<String>,
    pub prod_version: Option<i32>,
    pub deployment_project_id: Option<String>,
}

impl AppUpdate {
    /// Fields written by the AI config stage, hostname recomputed from the
    /// resolved brand name.
    pub fn from_config(app_id: AppId, config: &AppConfig, platform_domain: &str) -> Self {
        Self {
            name: Some(config.app_name.clone()),
            display_name: Some(config.display_name.clone()),
            category: Some(config.category),
            color_scheme: Some(config.color_scheme),
            production_url: Some(production_domain(&config.app_name, &app_id.to_string(), platform_domain)),
            ..Default::default()
        }
    }

    pub fn logo(url: impl Into<String>) -> Self {
        Self {
            logo: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn prod_version(version_number: i32) -> Self {
        Self {
            prod_version: Some(version_number),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
