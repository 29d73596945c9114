//! Handler for streaming staged demo files.
//!
//! This endpoint is public: the viewer page that embeds it performs the
//! access check. Its only guarantees are path containment and correct
//! content delivery.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use showcase_core::serving::{open_demo_file, DEMO_CACHE_CONTROL};
use showcase_core::types::DbId;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/demos/{project_id}/{*path}
///
/// Streams `DEMO_ROOT/{project_id}/{path}`. Directories serve their
/// `index.html`. Traversal attempts are rejected with 400 before any
/// filesystem access.
pub async fn serve_demo_file(
    State(state): State<AppState>,
    Path((project_id, path)): Path<(DbId, String)>,
) -> AppResult<Response> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let served = open_demo_file(&state.config.demos.demo_root, project_id, &segments).await?;

    tracing::debug!(project_id, path = %served.path.display(), len = served.len, "Serving demo file");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, served.content_type)
        .header(header::CONTENT_LENGTH, served.len.to_string())
        .header(header::CACHE_CONTROL, DEMO_CACHE_CONTROL)
        .body(Body::from_stream(ReaderStream::new(served.file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
