// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API
//!
//! axum router over the application services. Owner identity arrives in the
//! `x-user-id` header set by the upstream auth layer. App reads and writes
//! are scoped to that owner, so another user's app answers 404.
//!
//! | Failure | Status |
//! |---------|--------|
//! | not found | 404 |
//! | invalid state | 409 |
//! | missing deployment / project | 422 |
//! | no fields, bad input | 400 |
//! | deployment platform | 502 |
//! | store | 500 |

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::application::setup::{AppError, AppSetupService};
use crate::application::version::{VersionError, VersionService};
use crate::application::PromotionCoordinator;
use crate::domain::app::{App, AppId, AppStatus, AppUpdate};
use crate::domain::version::{Version, VersionId, VersionStatus, VersionUpdate};

pub const USER_ID_HEADER: &str = "x-user-id";

pub struct AppState {
    pub apps: Arc<AppSetupService>,
    pub versions: Arc<VersionService>,
    pub promotions: Arc<PromotionCoordinator>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/apps", post(create_app).get(list_apps))
        .route("/apps/{id}", get(get_app).patch(update_app).delete(delete_app))
        .route("/apps/{id}/versions", post(create_version).get(list_versions))
        .route("/versions/{id}", get(get_version).patch(update_version).delete(delete_version))
        .route("/versions/{id}/promote", post(promote_version))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<VersionError> for ApiError {
    fn from(err: VersionError) -> Self {
        let (status, code) = match &err {
            VersionError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            VersionError::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
            VersionError::MissingDeployment(_) => (StatusCode::UNPROCESSABLE_ENTITY, "missing_deployment"),
            VersionError::MissingProject(_) => (StatusCode::UNPROCESSABLE_ENTITY, "missing_project"),
            VersionError::NoFields => (StatusCode::BAD_REQUEST, "no_fields"),
            VersionError::Platform(_) => (StatusCode::BAD_GATEWAY, "platform_error"),
            VersionError::Repository(e) => {
                error!(error = %e, "version store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        ApiError::new(status, code, err.to_string())
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let (status, code) = match &err {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::NoFields => (StatusCode::BAD_REQUEST, "no_fields"),
            AppError::Repository(e) => {
                error!(error = %e, "app store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        ApiError::new(status, code, err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn owner(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", "missing x-user-id header"))
}

#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAppRequest {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub vercel_project_id: Option<String>,
}

impl UpdateAppRequest {
    fn into_update(self) -> ApiResult<AppUpdate> {
        let status = match self.status.as_deref() {
            None => None,
            Some("building") => Some(AppStatus::Building),
            Some("ready") => Some(AppStatus::Ready),
            Some("error") => Some(AppStatus::Error),
            Some(other) => return Err(ApiError::bad_request(format!("unknown app status '{}'", other))),
        };

        Ok(AppUpdate {
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            status,
            deployment_project_id: self.vercel_project_id,
            ..Default::default()
        })
    }
}

/// Wire form of a version update. `deploy_url` and `s3_key` are older names
/// for `vercel_url` and `s3_code_path`; the current name wins when both are sent.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateVersionRequest {
    pub status: Option<String>,
    pub s3_code_path: Option<String>,
    pub vercel_url: Option<String>,
    pub vercel_deploy_id: Option<String>,
    pub build_log: Option<String>,
    pub error_message: Option<String>,
    pub deploy_url: Option<String>,
    pub s3_key: Option<String>,
}

impl UpdateVersionRequest {
    pub fn into_update(self) -> ApiResult<VersionUpdate> {
        let status = match self.status.as_deref() {
            None => None,
            Some(value) => Some(
                VersionStatus::parse(value)
                    .ok_or_else(|| ApiError::bad_request(format!("unknown version status '{}'", value)))?,
            ),
        };

        Ok(VersionUpdate {
            status,
            code_path: self.s3_code_path.or(self.s3_key),
            deployment_url: self.vercel_url.or(self.deploy_url),
            deployment_id: self.vercel_deploy_id,
            build_log: self.build_log,
            error_message: self.error_message,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub id: Uuid,
    pub app_id: Uuid,
    pub version_number: i32,
    pub status: VersionStatus,
    pub s3_code_path: Option<String>,
    pub vercel_url: Option<String>,
    pub vercel_deploy_id: Option<String>,
    pub build_log: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Version> for VersionResponse {
    fn from(v: Version) -> Self {
        Self {
            id: v.id.0,
            app_id: v.app_id.0,
            version_number: v.version_number,
            status: v.status,
            s3_code_path: v.code_path,
            vercel_url: v.deployment_url,
            vercel_deploy_id: v.deployment_id,
            build_log: v.build_log,
            error_message: v.error_message,
            created_at: v.created_at,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_app(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateAppRequest>,
) -> ApiResult<(StatusCode, Json<App>)> {
    let user_id = owner(&headers)?;
    let app = state.apps.create_app(&user_id, &payload.description).await?;
    Ok((StatusCode::CREATED, Json(app)))
}

async fn list_apps(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<Json<Vec<App>>> {
    let user_id = owner(&headers)?;
    Ok(Json(state.apps.list_apps(&user_id).await?))
}

async fn get_app(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<App>> {
    let user_id = owner(&headers)?;
    Ok(Json(state.apps.get_app(AppId(id), &user_id).await?))
}

async fn update_app(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppRequest>,
) -> ApiResult<Json<App>> {
    let user_id = owner(&headers)?;
    let update = payload.into_update()?;
    Ok(Json(state.apps.update_app(AppId(id), &user_id, update).await?))
}

async fn delete_app(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let user_id = owner(&headers)?;
    state.apps.delete_app(AppId(id), &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<VersionResponse>)> {
    let version = state.versions.create_version(AppId(id)).await?;
    Ok((StatusCode::CREATED, Json(version.into())))
}

async fn list_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<VersionResponse>>> {
    let versions = state.versions.list_versions(AppId(id)).await?;
    Ok(Json(versions.into_iter().map(VersionResponse::from).collect()))
}

async fn get_version(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<VersionResponse>> {
    Ok(Json(state.versions.get_version(VersionId(id)).await?.into()))
}

async fn update_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVersionRequest>,
) -> ApiResult<Json<VersionResponse>> {
    let update = payload.into_update()?;
    Ok(Json(state.versions.update_version(VersionId(id), update).await?.into()))
}

async fn delete_version(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    state.versions.delete_version(VersionId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn promote_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<VersionResponse>> {
    Ok(Json(state.promotions.promote(VersionId(id)).await?.into()))
}
