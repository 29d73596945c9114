//! Public demo file route, mounted at the root.

use axum::routing::get;
use axum::Router;

use crate::handlers::demo_files;
use crate::state::AppState;

/// ```text
/// GET /api/demos/{project_id}/{*path}  -> serve_demo_file
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/demos/{project_id}/{*path}",
        get(demo_files::serve_demo_file),
    )
}
