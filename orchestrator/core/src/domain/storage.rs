// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Object Store and Image Generation Traits - Anti-Corruption Layer
//!
//! The asset stage of the setup pipeline talks to two external systems: an
//! image-generation service that returns a temporary URL, and a durable
//! object store the downloaded bytes are copied into. Both are abstracted
//! here so the pipeline can be exercised against in-memory backends.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Durable blob storage with public read URLs
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under `key` with an explicit content type.
    ///
    /// # Returns
    /// * `Ok(String)` - Public URL the object is served from
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError>;

    /// Public URL for a key, whether or not it exists yet
    fn public_url(&self, key: &str) -> String;
}

/// Image generation service
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Request a logo and return the temporary URL the result is hosted at
    async fn generate_logo(
        &self,
        app_name: &str,
        category: &str,
        color_scheme: &str,
    ) -> Result<String, AssetGenerationError>;

    /// Fetch the generated image bytes
    async fn download(&self, url: &str) -> Result<Bytes, AssetGenerationError>;
}

/// Object key for an application's logo
pub fn logo_key(app_id: &str) -> String {
    format!("apps/{}/logo.png", app_id)
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AssetGenerationError {
    #[error("image generation failed: {0}")]
    Generation(String),

    #[error("image download failed: {0}")]
    Download(String),

    #[error("image upload failed: {0}")]
    Upload(#[from] StorageError),
}
