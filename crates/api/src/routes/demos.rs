//! Demo viewer routes mounted at `/demos`.

use axum::routing::get;
use axum::Router;

use crate::handlers::viewer;
use crate::state::AppState;

/// ```text
/// GET /{slug}  -> get_demo_view
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{slug}", get(viewer::get_demo_view))
}
