pub mod admin;
pub mod demo_files;
pub mod demos;
pub mod health;
pub mod projects;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /demos/{slug}                                  viewer resolution (auth)
/// /projects/{project_id}/access/me               caller's access (auth)
///
/// /admin/demos                                   list, deploy (admin)
/// /admin/demos/{id}                              get, update, delete
/// /admin/demos/{id}/disable                      archive
/// /admin/demos/{id}/redeploy                     restage integrated demo
/// /admin/demos/{id}/access-logs                  view history
///
/// /admin/projects/{project_id}/access            list grants
/// /admin/projects/{project_id}/access/{user_id}  grant, revoke
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/demos", demos::router())
        .nest("/projects", projects::router())
        .nest("/admin/demos", admin::demos_router())
        .nest("/admin/projects", admin::access_router())
}
