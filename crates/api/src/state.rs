use std::sync::Arc;

use showcase_core::deploy::DeploymentOrchestrator;
use showcase_db::PgDemoStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: showcase_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Deployment orchestrator over the PostgreSQL demo store. Holds the
    /// per-project deployment locks, so there must be exactly one per process.
    pub demos: Arc<DeploymentOrchestrator<PgDemoStore>>,
}

impl AppState {
    pub fn new(pool: showcase_db::DbPool, config: ServerConfig) -> Self {
        let store = Arc::new(PgDemoStore::new(pool.clone()));
        let demos = Arc::new(DeploymentOrchestrator::new(store, config.demos.deploy_settings()));
        Self {
            pool,
            config: Arc::new(config),
            demos,
        }
    }

    /// The demo record store.
    pub fn store(&self) -> &PgDemoStore {
        self.demos.store()
    }
}
