// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Deployment Platform Capability
//!
//! Boundary to the hosting platform that builds and serves application
//! deployments. Only the fields the orchestrator consumes are modelled.
//!
//! Promotion repoints a project's production domain at one deployment. The
//! platform answers a repeat promotion with an "already production" conflict;
//! adapters surface that as [`PromoteOutcome::AlreadyProduction`] rather than
//! an error, which is what makes re-running a promotion safe.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub url: String,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoteOutcome {
    /// Domain now points at the deployment
    Promoted,
    /// Domain already pointed at the deployment
    AlreadyProduction,
}

#[async_trait]
pub trait DeploymentPlatform: Send + Sync {
    /// Create a preview deployment for a project
    async fn create_deployment(&self, project_name: &str) -> Result<Deployment, PlatformError>;

    /// Point `domain` of `project_id` at `deployment_id`
    async fn promote(
        &self,
        project_id: &str,
        deployment_id: &str,
        domain: &str,
    ) -> Result<PromoteOutcome, PlatformError>;

    /// Current state of a deployment
    async fn deployment_status(&self, deployment_id: &str) -> Result<Deployment, PlatformError>;

    /// Resolve a deployment from one of its hostnames
    async fn deployment_by_hostname(&self, hostname: &str) -> Result<Deployment, PlatformError>;

    /// Attach a domain to a project. An already attached domain is success.
    async fn add_domain(&self, project_id: &str, domain: &str) -> Result<(), PlatformError>;

    /// Remove SSO / password protection so deployments are publicly reachable
    async fn disable_protection(&self, project_id: &str) -> Result<(), PlatformError>;
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Platform API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode platform response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PlatformError::Decode(err.to_string())
        } else {
            PlatformError::Network(err.to_string())
        }
    }
}
