#![allow(dead_code)]

use std::path::Path;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use showcase_api::auth::jwt::{generate_access_token, JwtConfig};
use showcase_api::config::{DemoConfig, ServerConfig};
use showcase_api::router::build_app_router;
use showcase_api::state::AppState;
use showcase_db::models::project::CreateProject;
use showcase_db::models::user::CreateUser;
use showcase_db::repositories::{ProjectRepo, UserRepo};

pub const PUBLIC_BASE_URL: &str = "https://portal.example";

fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        access_token_expiry_mins: 15,
    }
}

/// Build a test `ServerConfig` with demos staged under `demo_root`.
pub fn test_config(demo_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: test_jwt_config(),
        demos: DemoConfig {
            demo_root: demo_root.to_path_buf(),
            public_base_url: PUBLIC_BASE_URL.to_string(),
            max_file_mb: 100,
        },
    }
}

/// Build the full application router through the same builder `main.rs` uses.
pub fn build_test_app(pool: PgPool, demo_root: &Path) -> Router {
    let config = test_config(demo_root);
    let state = AppState::new(pool, config.clone());
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_user(pool: &PgPool, username: &str, role: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            role: role.to_string(),
        },
    )
    .await
    .expect("user creation should succeed")
    .id
}

pub async fn create_project(pool: &PgPool, name: &str, client_id: i64) -> i64 {
    ProjectRepo::create(
        pool,
        &CreateProject {
            name: name.to_string(),
            client_id,
        },
    )
    .await
    .expect("project creation should succeed")
    .id
}

/// Bearer token for `user_id` signed with the test secret.
pub fn token_for(user_id: i64, role: &str) -> String {
    generate_access_token(user_id, role, &test_jwt_config()).expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("request should not fail")
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header("authorization", format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, builder(Method::GET, uri, None).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, builder(Method::GET, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    let request = builder(Method::POST, uri, Some(token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    let request = builder(Method::PUT, uri, Some(token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, builder(Method::DELETE, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body should be JSON")
}
