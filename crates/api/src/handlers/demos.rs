//! Handlers for admin demo management.
//!
//! Deployments never fail with an HTTP error once the request body is
//! well-formed: the outcome is reported in a [`DeploymentResult`], with 201 on
//! success and 422 when the deployment was rejected or staging failed.

use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use showcase_core::demo::{BuildType, DemoType, UpdateDemo};
use showcase_core::demo_store::DemoRecordStore;
use showcase_core::deploy::{
    DeploymentRequest, DeploymentResult, ExternalDeployment, IntegratedDeployment,
};
use showcase_core::error::CoreError;
use showcase_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/admin/demos`.
#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub project_id: DbId,
    pub demo_name: String,
    pub demo_type: DemoType,
    /// Required for integrated demos.
    pub build_type: Option<BuildType>,
    /// Server-local build output directory. Required for integrated demos.
    pub local_path: Option<String>,
    /// Required for external demos.
    pub external_url: Option<String>,
    pub external_description: Option<String>,
}

impl DeployRequest {
    fn into_deployment(self, requested_by: DbId) -> Result<DeploymentRequest, AppError> {
        match self.demo_type {
            DemoType::Integrated => {
                let build_type = self.build_type.ok_or_else(|| {
                    AppError::BadRequest("build_type is required for integrated demos".into())
                })?;
                let local_path = non_empty(self.local_path).ok_or_else(|| {
                    AppError::BadRequest("local_path is required for integrated demos".into())
                })?;
                Ok(DeploymentRequest::Integrated(IntegratedDeployment {
                    project_id: self.project_id,
                    demo_name: self.demo_name,
                    build_type,
                    source_path: PathBuf::from(local_path),
                    requested_by,
                }))
            }
            DemoType::External => {
                let external_url = non_empty(self.external_url).ok_or_else(|| {
                    AppError::BadRequest("external_url is required for external demos".into())
                })?;
                Ok(DeploymentRequest::External(ExternalDeployment {
                    project_id: self.project_id,
                    demo_name: self.demo_name,
                    external_url,
                    external_description: self.external_description,
                    requested_by,
                }))
            }
        }
    }
}

/// Request body for `POST /api/v1/admin/demos/{id}/redeploy`.
#[derive(Debug, Deserialize)]
pub struct RedeployRequest {
    /// Defaults to the demo's current build type.
    pub build_type: Option<BuildType>,
    pub local_path: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 201 for a successful deployment, 422 otherwise.
fn deployment_response(result: DeploymentResult) -> impl IntoResponse {
    let status = if result.success {
        StatusCode::CREATED
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(DataResponse { data: result }))
}

fn demo_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Demo", id })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/demos
pub async fn list_demos(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let demos = state.store().list_demos().await.map_err(CoreError::from)?;
    Ok(Json(DataResponse { data: demos }))
}

/// GET /api/v1/admin/demos/{id}
pub async fn get_demo(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let demo = state
        .store()
        .find_demo(id)
        .await
        .map_err(CoreError::from)?
        .ok_or_else(|| demo_not_found(id))?;
    Ok(Json(DataResponse { data: demo }))
}

/// GET /api/v1/admin/demos/{id}/access-logs
///
/// Views of the demo, most recent first.
pub async fn list_access_logs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let store = state.store();
    if store.find_demo(id).await.map_err(CoreError::from)?.is_none() {
        return Err(demo_not_found(id));
    }
    let logs = store.list_access_logs(id).await.map_err(CoreError::from)?;
    Ok(Json(DataResponse { data: logs }))
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/demos
///
/// Deploy a demo for a project in either mode. Deploying again for a project
/// that already has a demo of the same mode restages or relinks it.
pub async fn create_demo(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<DeployRequest>,
) -> AppResult<impl IntoResponse> {
    let request = input.into_deployment(admin.user_id)?;
    let project_id = request.project_id();
    let result = state.demos.deploy(request).await;

    tracing::info!(
        project_id,
        demo_id = ?result.demo_id,
        success = result.success,
        user_id = admin.user_id,
        "Demo deployment requested",
    );

    Ok(deployment_response(result))
}

/// POST /api/v1/admin/demos/{id}/redeploy
///
/// Restage an integrated demo from a new build directory.
pub async fn redeploy_demo(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RedeployRequest>,
) -> AppResult<impl IntoResponse> {
    if input.local_path.trim().is_empty() {
        return Err(AppError::BadRequest("local_path must not be empty".into()));
    }
    let result = state
        .demos
        .redeploy_integrated(id, input.build_type, std::path::Path::new(&input.local_path))
        .await;

    tracing::info!(
        demo_id = id,
        success = result.success,
        user_id = admin.user_id,
        "Demo redeployment requested",
    );

    Ok(deployment_response(result))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// PUT /api/v1/admin/demos/{id}
///
/// Edit the demo name or external link. Mode and slug are fixed.
pub async fn update_demo(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDemo>,
) -> AppResult<impl IntoResponse> {
    let demo = state.demos.update_demo(id, input).await?;

    tracing::info!(demo_id = id, user_id = admin.user_id, "Demo updated");

    Ok(Json(DataResponse { data: demo }))
}

/// POST /api/v1/admin/demos/{id}/disable
///
/// Archive a demo. Files stay on disk; a later deployment revives it.
pub async fn disable_demo(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let demo = state.demos.disable_demo(id).await?;

    tracing::info!(demo_id = id, user_id = admin.user_id, "Demo disabled");

    Ok(Json(DataResponse { data: demo }))
}

/// DELETE /api/v1/admin/demos/{id}
///
/// Remove staged files and the record. Access logs go with it.
pub async fn delete_demo(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.demos.delete_demo(id).await?;

    tracing::info!(demo_id = id, user_id = admin.user_id, "Demo deleted");

    Ok(StatusCode::NO_CONTENT)
}
