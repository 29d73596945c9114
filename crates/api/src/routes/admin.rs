//! Admin routes for demos and project access.
//!
//! - `demos_router()` mounted at `/admin/demos`
//! - `access_router()` mounted at `/admin/projects`

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{access, demos};
use crate::state::AppState;

/// Demo management routes mounted at `/admin/demos`.
///
/// ```text
/// GET    /                  -> list_demos
/// POST   /                  -> create_demo
/// GET    /{id}              -> get_demo
/// PUT    /{id}              -> update_demo
/// DELETE /{id}              -> delete_demo
/// POST   /{id}/disable      -> disable_demo
/// POST   /{id}/redeploy     -> redeploy_demo
/// GET    /{id}/access-logs  -> list_access_logs
/// ```
pub fn demos_router() -> Router<AppState> {
    Router::new()
        .route("/", get(demos::list_demos).post(demos::create_demo))
        .route(
            "/{id}",
            get(demos::get_demo)
                .put(demos::update_demo)
                .delete(demos::delete_demo),
        )
        .route("/{id}/disable", post(demos::disable_demo))
        .route("/{id}/redeploy", post(demos::redeploy_demo))
        .route("/{id}/access-logs", get(demos::list_access_logs))
}

/// Access grant routes mounted at `/admin/projects`.
///
/// ```text
/// GET    /{project_id}/access            -> list_grants
/// PUT    /{project_id}/access/{user_id}  -> put_grant
/// DELETE /{project_id}/access/{user_id}  -> delete_grant
/// ```
pub fn access_router() -> Router<AppState> {
    Router::new()
        .route("/{project_id}/access", get(access::list_grants))
        .route(
            "/{project_id}/access/{user_id}",
            put(access::put_grant).delete(access::delete_grant),
        )
}
