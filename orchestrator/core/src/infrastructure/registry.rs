// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// App Registry Adapters
//
// CliAppRegistry shells out to the registry management tool:
//   <binary> create <app_id> --name <name> --owner-email <email>
//   <binary> update <app_id> --name <name> --logo <url>
//
// InMemoryAppRegistry records requests for tests and local runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::registry::{AppRegistry, RegistrySyncError, RegistrySyncRequest};
use crate::domain::service_config::RegistryConfig;

pub struct CliAppRegistry {
    binary: String,
    path_override: Option<String>,
    timeout: Duration,
}

impl CliAppRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            path_override: config.path_override.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn args(request: &RegistrySyncRequest) -> Vec<String> {
        let mut args = vec![
            request.mode.as_arg().to_string(),
            request.app_id.to_string(),
            "--name".to_string(),
            request.name.clone(),
        ];
        if let Some(email) = &request.owner_email {
            args.push("--owner-email".to_string());
            args.push(email.clone());
        }
        if let Some(logo) = &request.logo {
            args.push("--logo".to_string());
            args.push(logo.clone());
        }
        args
    }
}

#[async_trait]
impl AppRegistry for CliAppRegistry {
    async fn sync(&self, request: &RegistrySyncRequest) -> Result<(), RegistrySyncError> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(Self::args(request)).kill_on_drop(true);

        if let Some(path) = &self.path_override {
            cmd.env("PATH", path);
        }

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                debug!(app_id = %request.app_id, mode = %request.mode, stdout = %stdout.trim(), "registry command finished");

                if output.status.success() {
                    Ok(())
                } else {
                    Err(RegistrySyncError::NonZeroExit {
                        code: output.status.code(),
                        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    })
                }
            }
            Ok(Err(e)) => Err(RegistrySyncError::Launch(e.to_string())),
            Err(_) => Err(RegistrySyncError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAppRegistry {
    calls: Arc<Mutex<Vec<RegistrySyncRequest>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl InMemoryAppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose every sync is rejected with `reason`. Calls are still recorded.
    pub fn failing(reason: impl Into<String>) -> Self {
        let registry = Self::default();
        *registry.failure.lock() = Some(reason.into());
        registry
    }

    pub fn calls(&self) -> Vec<RegistrySyncRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AppRegistry for InMemoryAppRegistry {
    async fn sync(&self, request: &RegistrySyncRequest) -> Result<(), RegistrySyncError> {
        self.calls.lock().push(request.clone());
        match self.failure.lock().as_ref() {
            Some(reason) => Err(RegistrySyncError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::app::AppId;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_script(dir: &Path, body: &str) -> String {
        let path = dir.join("app-manager");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    fn registry(binary: String, timeout_secs: u64) -> CliAppRegistry {
        CliAppRegistry::new(&RegistryConfig {
            binary,
            path_override: Some("/usr/bin:/bin".to_string()),
            timeout_secs,
        })
    }

    #[tokio::test]
    async fn test_create_passes_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args.txt");
        let binary = write_script(dir.path(), &format!("echo \"$@\" > {}", out.display()));

        let app_id = AppId::new();
        let request = RegistrySyncRequest::create(app_id, "Taskly", "owner@example.com");
        registry(binary, 5).sync(&request).await.unwrap();

        let recorded = std::fs::read_to_string(out).unwrap();
        assert_eq!(
            recorded.trim(),
            format!("create {} --name Taskly --owner-email owner@example.com", app_id)
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let binary = write_script(dir.path(), "echo 'duplicate app' >&2; exit 3");

        let request = RegistrySyncRequest::update(AppId::new(), "Taskly", Some("https://cdn/logo.png".into()));
        let err = registry(binary, 5).sync(&request).await.unwrap_err();
        match err {
            RegistrySyncError::NonZeroExit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "duplicate app");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let request = RegistrySyncRequest::create(AppId::new(), "Taskly", "a@b.c");
        let err = registry("/nonexistent/app-manager".into(), 5).sync(&request).await.unwrap_err();
        assert!(matches!(err, RegistrySyncError::Launch(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let binary = write_script(dir.path(), "sleep 5");

        let request = RegistrySyncRequest::create(AppId::new(), "Taskly", "a@b.c");
        let err = registry(binary, 0).sync(&request).await.unwrap_err();
        assert!(matches!(err, RegistrySyncError::Timeout(0)));
    }

    #[tokio::test]
    async fn test_in_memory_registry_records_calls() {
        let registry = InMemoryAppRegistry::failing("mongo down");
        let request = RegistrySyncRequest::create(AppId::new(), "Taskly", "a@b.c");
        assert!(matches!(registry.sync(&request).await, Err(RegistrySyncError::Rejected(_))));
        assert_eq!(registry.calls(), vec![request]);
    }
}
