//! Caller-scoped project routes mounted at `/projects`.

use axum::routing::get;
use axum::Router;

use crate::handlers::viewer;
use crate::state::AppState;

/// ```text
/// GET /{project_id}/access/me  -> get_my_access
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{project_id}/access/me", get(viewer::get_my_access))
}
