use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Whether the demo root directory exists.
    pub demo_root_present: bool,
}

/// GET /health -- service, database and demo storage health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = showcase_db::health_check(&state.pool).await.is_ok();
    let demo_root_present = tokio::fs::metadata(&state.config.demos.demo_root)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let status = if db_healthy && demo_root_present {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        demo_root_present,
    })
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
