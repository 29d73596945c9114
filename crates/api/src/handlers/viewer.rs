//! Handlers used by the demo viewer page.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use showcase_core::access::{resolve_for_user, AccessResolution};
use showcase_core::types::DbId;
use showcase_core::viewer::{view_demo, DemoView, Viewer};

use crate::error::AppResult;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// First address in `X-Forwarded-For`, if present.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// GET /api/v1/demos/{slug}
///
/// Resolve a demo for the caller and record the view when allowed.
pub async fn get_demo_view(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<DataResponse<DemoView>>> {
    let viewer = Viewer {
        user_id: user.user_id,
        is_admin: user.is_admin(),
        ip_address: client_ip(&headers),
        user_agent: user_agent(&headers),
    };
    let view = view_demo(state.store(), &slug, &viewer).await?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/projects/{project_id}/access/me
///
/// The caller's effective access to a project. Admins get full access.
pub async fn get_my_access(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<AccessResolution>>> {
    let resolution = if user.is_admin() {
        AccessResolution::admin()
    } else {
        resolve_for_user(state.store(), user.user_id, project_id).await?
    };
    Ok(Json(DataResponse { data: resolution }))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn client_ip_takes_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
