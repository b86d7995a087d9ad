// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Runware Image Generation Adapter
//
// Anti-Corruption Layer for the Runware task API. Requests are a JSON array
// of tasks; a single `imageInference` task is sent per logo and the
// returned `imageURL` is a temporary location the bytes are downloaded from.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::storage::{AssetGenerationError, ImageGenerator};

const LOGO_SIZE: u32 = 512;

pub struct RunwareAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageInferenceTask {
    task_type: &'static str,
    #[serde(rename = "taskUUID")]
    task_uuid: String,
    positive_prompt: String,
    model: String,
    width: u32,
    height: u32,
    number_results: u32,
    output_type: &'static str,
    output_format: &'static str,
}

#[derive(Deserialize)]
struct RunwareResponse {
    #[serde(default)]
    data: Vec<RunwareResult>,
    #[serde(default)]
    errors: Vec<RunwareErrorEntry>,
}

#[derive(Deserialize)]
struct RunwareResult {
    #[serde(rename = "imageURL")]
    image_url: Option<String>,
}

#[derive(Deserialize)]
struct RunwareErrorEntry {
    #[serde(default)]
    message: String,
}

impl RunwareAdapter {
    pub fn new(endpoint: String, api_key: String, model: String) -> Result<Self, AssetGenerationError> {
        Self::with_timeout(endpoint, api_key, model, Duration::from_secs(90))
    }

    pub fn with_timeout(
        endpoint: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, AssetGenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssetGenerationError::Generation(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
        })
    }
}

/// Prompt for a square app-icon style logo
pub fn logo_prompt(app_name: &str, category: &str, color_scheme: &str) -> String {
    format!(
        "Minimal modern app icon logo for \"{}\", a {} application. \
         Flat vector style, {} color palette, simple geometric mark, \
         centered on a plain background, no text, high contrast.",
        app_name, category, color_scheme
    )
}

#[async_trait]
impl ImageGenerator for RunwareAdapter {
    async fn generate_logo(
        &self,
        app_name: &str,
        category: &str,
        color_scheme: &str,
    ) -> Result<String, AssetGenerationError> {
        let tasks = vec![ImageInferenceTask {
            task_type: "imageInference",
            task_uuid: Uuid::new_v4().to_string(),
            positive_prompt: logo_prompt(app_name, category, color_scheme),
            model: self.model.clone(),
            width: LOGO_SIZE,
            height: LOGO_SIZE,
            number_results: 1,
            output_type: "URL",
            output_format: "PNG",
        }];

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&tasks)
            .send()
            .await
            .map_err(|e| AssetGenerationError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssetGenerationError::Generation(format!("HTTP {}: {}", status, body)));
        }

        let parsed: RunwareResponse = response
            .json()
            .await
            .map_err(|e| AssetGenerationError::Generation(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = parsed.errors.first() {
            return Err(AssetGenerationError::Generation(error.message.clone()));
        }

        parsed
            .data
            .into_iter()
            .find_map(|r| r.image_url.filter(|url| !url.is_empty()))
            .ok_or_else(|| AssetGenerationError::Generation("no image returned".to_string()))
    }

    async fn download(&self, url: &str) -> Result<Bytes, AssetGenerationError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AssetGenerationError::Download(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AssetGenerationError::Download(format!("HTTP {}", response.status())));
        }

        response
            .bytes()
            .await
            .map_err(|e| AssetGenerationError::Download(e.to_string()))
    }
}
