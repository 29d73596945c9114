use std::path::PathBuf;

use showcase_core::deploy::DeploySettings;
use showcase_core::staging::StagingPolicy;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`). Deployments stage
    /// files inside the request, so this bounds the largest deployable build.
    pub request_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Demo storage and addressing.
    pub demos: DemoConfig,
}

/// Where demos live on disk and how they are addressed.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Root directory integrated demos are staged under.
    pub demo_root: PathBuf,
    /// Prefix of generated viewer URLs, e.g. `https://portal.example`.
    pub public_base_url: String,
    /// Per-file size ceiling in MiB; larger files are skipped when staging.
    pub max_file_mb: u64,
}

impl DemoConfig {
    pub fn deploy_settings(&self) -> DeploySettings {
        DeploySettings {
            demo_root: self.demo_root.clone(),
            public_base_url: self.public_base_url.clone(),
            policy: StagingPolicy {
                max_file_bytes: self.max_file_mb * 1024 * 1024,
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `300`                      |
    /// | `DEMO_ROOT`            | `storage/demos`            |
    /// | `PUBLIC_BASE_URL`      | `http://localhost:3000`    |
    /// | `DEMO_MAX_FILE_MB`     | `100`                      |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let demo_root = PathBuf::from(
            std::env::var("DEMO_ROOT").unwrap_or_else(|_| "storage/demos".into()),
        );
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();
        let max_file_mb: u64 = std::env::var("DEMO_MAX_FILE_MB")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("DEMO_MAX_FILE_MB must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            demos: DemoConfig {
                demo_root,
                public_base_url,
                max_file_mb,
            },
        }
    }
}
