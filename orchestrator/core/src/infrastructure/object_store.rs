// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # OpenDAL Object Store
//!
//! `ObjectStore` over an `opendal::Operator`. Production uses the S3 service;
//! tests and local runs use the in-memory service. Public URLs are
//! `{public_base_url}/{key}` regardless of backend.

use async_trait::async_trait;
use bytes::Bytes;
use opendal::{services, Operator};

use crate::domain::service_config::ObjectStoreConfig;
use crate::domain::storage::{ObjectStore, StorageError};

pub struct OpendalObjectStore {
    operator: Operator,
    public_base_url: String,
}

impl OpendalObjectStore {
    pub fn new(operator: Operator, public_base_url: impl Into<String>) -> Self {
        Self {
            operator,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// S3 backed store. Credentials come from the standard AWS environment.
    pub fn s3(config: &ObjectStoreConfig) -> Result<Self, StorageError> {
        let mut builder = services::S3::default()
            .bucket(&config.bucket)
            .region(&config.region);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .finish();

        Ok(Self::new(operator, config.public_base_url()))
    }

    /// Process-local store for tests and dev mode
    pub fn memory(public_base_url: impl Into<String>) -> Result<Self, StorageError> {
        let operator = Operator::new(services::Memory::default())
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .finish();

        Ok(Self::new(operator, public_base_url))
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

#[async_trait]
impl ObjectStore for OpendalObjectStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError> {
        if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        self.operator
            .write_with(key, data)
            .content_type(content_type)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::logo_key;

    #[tokio::test]
    async fn test_put_writes_bytes_and_returns_public_url() {
        let store = OpendalObjectStore::memory("https://assets.s3.amazonaws.com/").unwrap();
        let key = logo_key("2028362b-a14a-43ac-87d8-0e26c7401623");

        let url = store
            .put(&key, Bytes::from_static(b"\x89PNG"), "image/png")
            .await
            .unwrap();

        assert_eq!(
            url,
            "https://assets.s3.amazonaws.com/apps/2028362b-a14a-43ac-87d8-0e26c7401623/logo.png"
        );
        let stored = store.operator().read(&key).await.unwrap().to_bytes();
        assert_eq!(stored.as_ref(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_rejects_directory_keys() {
        let store = OpendalObjectStore::memory("https://assets.example").unwrap();
        let err = store.put("apps/", Bytes::new(), "image/png").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn test_default_public_base_url() {
        let config = ObjectStoreConfig {
            bucket: "rapidbuild-assets".to_string(),
            ..Default::default()
        };
        assert_eq!(config.public_base_url(), "https://rapidbuild-assets.s3.amazonaws.com");
    }
}
