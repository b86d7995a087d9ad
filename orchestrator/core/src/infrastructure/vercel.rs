// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Vercel Deployment Platform Client
//!
//! `DeploymentPlatform` over the Vercel REST API with bearer-token auth and
//! a 30 second client timeout. When a team id is configured it is sent as the
//! `teamId` query parameter on every call.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | create deployment | `POST /v13/deployments` |
//! | deployment status / by hostname | `GET /v13/deployments/{id or host}` |
//! | promote | `PATCH /v9/projects/{project}/domains/{domain}` |
//! | add domain | `POST /v10/projects/{project}/domains` |
//! | disable protection | `PATCH /v9/projects/{project}` |

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::deployment::{Deployment, DeploymentPlatform, PlatformError, PromoteOutcome};
use crate::domain::service_config::VercelConfig;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct VercelClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
    team_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VercelDeployment {
    id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    ready_state: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl From<VercelDeployment> for Deployment {
    fn from(d: VercelDeployment) -> Self {
        Deployment {
            id: d.id,
            url: d.url,
            state: d.ready_state.or(d.state).unwrap_or_default(),
        }
    }
}

impl VercelClient {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        team_id: Option<String>,
    ) -> Result<Self, PlatformError> {
        Self::with_timeout(api_base, token, team_id, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        api_base: impl Into<String>,
        token: impl Into<String>,
        team_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            team_id,
        })
    }

    pub fn from_config(config: &VercelConfig, token: String) -> Result<Self, PlatformError> {
        Self::new(config.api_base.clone(), token, config.team_id.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.token);
        if let Some(team_id) = &self.team_id {
            builder = builder.query(&[("teamId", team_id.as_str())]);
        }
        builder
    }

    async fn api_error(response: Response) -> PlatformError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        PlatformError::Api { status, body }
    }

    async fn get_deployment(&self, id_or_host: &str) -> Result<Deployment, PlatformError> {
        let response = self
            .request(Method::GET, &format!("/v13/deployments/{}", id_or_host))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let deployment: VercelDeployment = response.json().await?;
        Ok(deployment.into())
    }
}

fn is_already_production(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT && body.to_lowercase().contains("already")
}

fn is_domain_already_attached(status: StatusCode, body: &str) -> bool {
    (status == StatusCode::BAD_REQUEST || status == StatusCode::CONFLICT)
        && (body.contains("already exists") || body.contains("domain_already_exists") || body.contains("domain_already_in_use"))
}

#[async_trait]
impl DeploymentPlatform for VercelClient {
    async fn create_deployment(&self, project_name: &str) -> Result<Deployment, PlatformError> {
        let response = self
            .request(Method::POST, "/v13/deployments")
            .json(&json!({ "name": project_name, "target": "preview" }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let deployment: VercelDeployment = response.json().await?;
        Ok(deployment.into())
    }

    async fn promote(
        &self,
        project_id: &str,
        deployment_id: &str,
        domain: &str,
    ) -> Result<PromoteOutcome, PlatformError> {
        let response = self
            .request(Method::PATCH, &format!("/v9/projects/{}/domains/{}", project_id, domain))
            .json(&json!({ "gitBranch": null, "redirect": null, "target": deployment_id }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(project_id, deployment_id, domain, "production domain repointed");
            return Ok(PromoteOutcome::Promoted);
        }

        let body = response.text().await.unwrap_or_default();
        if is_already_production(status, &body) {
            debug!(project_id, deployment_id, domain, "deployment already serves production domain");
            return Ok(PromoteOutcome::AlreadyProduction);
        }

        Err(PlatformError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn deployment_status(&self, deployment_id: &str) -> Result<Deployment, PlatformError> {
        self.get_deployment(deployment_id).await
    }

    async fn deployment_by_hostname(&self, hostname: &str) -> Result<Deployment, PlatformError> {
        let host = hostname
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        self.get_deployment(host).await
    }

    async fn add_domain(&self, project_id: &str, domain: &str) -> Result<(), PlatformError> {
        let response = self
            .request(Method::POST, &format!("/v10/projects/{}/domains", project_id))
            .json(&json!({ "name": domain }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if is_domain_already_attached(status, &body) {
            return Ok(());
        }

        Err(PlatformError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn disable_protection(&self, project_id: &str) -> Result<(), PlatformError> {
        let response = self
            .request(Method::PATCH, &format!("/v9/projects/{}", project_id))
            .json(&json!({ "ssoProtection": null, "passwordProtection": null }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_promote_sends_target() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/v9/projects/prj_1/domains/taskly-401623.rapidbuild.app")
            .match_header("authorization", "Bearer vc-token")
            .match_body(Matcher::PartialJsonString(r#"{"target":"dpl_9"}"#.to_string()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = VercelClient::new(server.url(), "vc-token", None).unwrap();
        let outcome = client
            .promote("prj_1", "dpl_9", "taskly-401623.rapidbuild.app")
            .await
            .unwrap();

        assert_eq!(outcome, PromoteOutcome::Promoted);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_promote_already_production_is_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/v9/projects/prj_1/domains/a.rapidbuild.app")
            .with_status(409)
            .with_body(r#"{"error":{"code":"conflict","message":"Deployment is already the production deployment"}}"#)
            .create_async()
            .await;

        let client = VercelClient::new(server.url(), "t", None).unwrap();
        let outcome = client.promote("prj_1", "dpl_9", "a.rapidbuild.app").await.unwrap();
        assert_eq!(outcome, PromoteOutcome::AlreadyProduction);
    }

    #[tokio::test]
    async fn test_promote_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/v9/projects/prj_1/domains/a.rapidbuild.app")
            .with_status(500)
            .with_body("internal")
            .create_async()
            .await;

        let client = VercelClient::new(server.url(), "t", None).unwrap();
        let err = client.promote("prj_1", "dpl_9", "a.rapidbuild.app").await.unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_add_domain_already_exists_is_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v10/projects/prj_1/domains")
            .with_status(400)
            .with_body(r#"{"error":{"code":"domain_already_exists"}}"#)
            .create_async()
            .await;

        let client = VercelClient::new(server.url(), "t", None).unwrap();
        client.add_domain("prj_1", "a.rapidbuild.app").await.unwrap();
    }

    #[tokio::test]
    async fn test_deployment_status_reads_ready_state_and_team() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v13/deployments/dpl_9")
            .match_query(Matcher::UrlEncoded("teamId".into(), "team_1".into()))
            .with_status(200)
            .with_body(r#"{"id":"dpl_9","url":"taskly-abc.vercel.app","readyState":"READY"}"#)
            .create_async()
            .await;

        let client = VercelClient::new(server.url(), "t", Some("team_1".to_string())).unwrap();
        let deployment = client.deployment_status("dpl_9").await.unwrap();
        assert_eq!(deployment.url, "taskly-abc.vercel.app");
        assert_eq!(deployment.state, "READY");
    }

    #[tokio::test]
    async fn test_deployment_by_hostname_strips_scheme() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v13/deployments/taskly-abc.vercel.app")
            .with_status(200)
            .with_body(r#"{"id":"dpl_9","url":"taskly-abc.vercel.app","state":"BUILDING"}"#)
            .create_async()
            .await;

        let client = VercelClient::new(server.url(), "t", None).unwrap();
        let deployment = client.deployment_by_hostname("https://taskly-abc.vercel.app/").await.unwrap();
        assert_eq!(deployment.id, "dpl_9");
        assert_eq!(deployment.state, "BUILDING");
    }

    #[tokio::test]
    async fn test_disable_protection_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/v9/projects/prj_1")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let client = VercelClient::new(server.url(), "t", None).unwrap();
        let err = client.disable_protection("prj_1").await.unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 403, ref body } if body == "forbidden"));
    }

    #[tokio::test]
    async fn test_unresponsive_platform_times_out() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client =
            VercelClient::with_timeout(format!("http://{}", addr), "t", None, Duration::from_millis(200)).unwrap();
        let err = client.deployment_status("dpl_1").await.unwrap_err();
        assert!(matches!(err, PlatformError::Network(_)));
    }
}
