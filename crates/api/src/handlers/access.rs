//! Handlers for admin management of project access grants.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use showcase_core::access::{grant_access, revoke_access, AccessLevel, DemoPermissions, GrantAccess};
use showcase_core::demo_store::DemoRecordStore;
use showcase_core::error::CoreError;
use showcase_core::types::DbId;
use showcase_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /api/v1/admin/projects/{project_id}/access/{user_id}`.
#[derive(Debug, Deserialize)]
pub struct GrantAccessRequest {
    /// `owner`, `collaborator` or `viewer`. Legacy names are accepted.
    pub access_level: String,
    /// Overrides the level's default permission set.
    pub permissions: Option<DemoPermissions>,
}

/// GET /api/v1/admin/projects/{project_id}/access
pub async fn list_grants(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let store = state.store();
    if store
        .find_project(project_id)
        .await
        .map_err(CoreError::from)?
        .is_none()
    {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }));
    }
    let grants = store.list_grants(project_id).await.map_err(CoreError::from)?;
    Ok(Json(DataResponse { data: grants }))
}

/// PUT /api/v1/admin/projects/{project_id}/access/{user_id}
///
/// Create or replace the grant for a user.
pub async fn put_grant(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((project_id, user_id)): Path<(DbId, DbId)>,
    Json(input): Json<GrantAccessRequest>,
) -> AppResult<impl IntoResponse> {
    let access_level: AccessLevel = input.access_level.parse()?;
    UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;

    let grant = grant_access(
        state.store(),
        &GrantAccess::new(
            project_id,
            user_id,
            access_level,
            input.permissions,
            admin.user_id,
        ),
    )
    .await?;

    Ok(Json(DataResponse { data: grant }))
}

/// DELETE /api/v1/admin/projects/{project_id}/access/{user_id}
pub async fn delete_grant(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((project_id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    revoke_access(state.store(), project_id, user_id).await?;

    tracing::info!(
        project_id,
        user_id,
        revoked_by = admin.user_id,
        "Project access revoked",
    );

    Ok(StatusCode::NO_CONTENT)
}
