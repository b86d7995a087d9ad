// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Config Extraction
//!
//! Turns a free-text app description into an [`AppConfig`] by prompting an
//! [`LLMProvider`] for a constrained JSON object.
//!
//! Any failure (transport, empty reply, unparsable JSON) is an
//! [`ExtractionError`] with no partial result; the setup pipeline substitutes
//! `AppConfig::default()`. Parsed replies are normalized field by field so a
//! sparse but valid reply still yields a usable config.

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::app::{AppCategory, AppConfig, ColorScheme, PLACEHOLDER_NAME};
use crate::domain::llm::{GenerationOptions, LLMError, LLMProvider};

const PROMPT_TEMPLATE: &str = r#"Analyze this app description and extract configuration as JSON:

Description: "{description}"

Respond with ONLY valid JSON (no markdown, no explanations):
{
  "appName": "BrandName (creative brand name, no spaces)",
  "displayName": "Display Name (branded name with proper formatting)",
  "requiresAuth": true/false,
  "allowSignup": true/false,
  "category": "productivity|social|ecommerce|content|dashboard|other",
  "keywords": ["keyword1", "keyword2", "keyword3"],
  "colorScheme": "blue|green|purple|orange|red|teal|indigo"
}

Rules:
- appName: a creative, memorable brand name, alphanumeric only (no spaces, hyphens or special characters)
- displayName: the branded display name, proper capitalization and spacing allowed
- requiresAuth: true if users need login/accounts, false for public sites
- allowSignup: false only if "internal", "team", "invite" or "admin" is mentioned
- category: best fit category
- keywords: 3-5 relevant keywords
- colorScheme: pick the color matching the app's vibe"#;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("AI endpoint call failed: {0}")]
    Provider(#[from] LLMError),

    #[error("failed to parse config JSON: {source} (response: {response})")]
    Parse {
        source: serde_json::Error,
        response: String,
    },
}

/// Reply shape before normalization. Every field is optional so that a
/// partially filled object still parses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAppConfig {
    app_name: String,
    display_name: String,
    requires_auth: bool,
    allow_signup: bool,
    category: String,
    keywords: Vec<String>,
    color_scheme: String,
}

impl RawAppConfig {
    fn normalize(self) -> AppConfig {
        let app_name = if self.app_name.trim().is_empty() {
            PLACEHOLDER_NAME.to_string()
        } else {
            self.app_name.trim().to_string()
        };
        let display_name = if self.display_name.trim().is_empty() {
            app_name.clone()
        } else {
            self.display_name.trim().to_string()
        };
        let keywords = if self.keywords.is_empty() {
            vec!["app".to_string()]
        } else {
            self.keywords
        };

        AppConfig {
            app_name,
            display_name,
            requires_auth: self.requires_auth,
            allow_signup: self.allow_signup,
            category: AppCategory::parse_lossy(&self.category),
            keywords,
            color_scheme: ColorScheme::parse_lossy(&self.color_scheme),
        }
    }
}

pub fn build_prompt(description: &str) -> String {
    PROMPT_TEMPLATE.replace("{description}", description)
}

/// Remove a surrounding ```json / ``` fence if the model added one
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

pub fn parse_config(reply: &str) -> Result<AppConfig, ExtractionError> {
    let body = strip_code_fence(reply);
    let raw: RawAppConfig = serde_json::from_str(body).map_err(|source| ExtractionError::Parse {
        source,
        response: body.to_string(),
    })?;
    Ok(raw.normalize())
}

pub struct ConfigExtractor {
    provider: Arc<dyn LLMProvider>,
    options: GenerationOptions,
}

impl ConfigExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            options: GenerationOptions::default(),
        }
    }

    pub async fn extract(&self, description: &str) -> Result<AppConfig, ExtractionError> {
        let prompt = build_prompt(description);
        let response = self.provider.generate(&prompt, &self.options).await?;
        parse_config(&response.text)
    }
}
