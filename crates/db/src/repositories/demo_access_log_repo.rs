//! Repository for the `demo_access_logs` table.

use showcase_core::demo_store::NewAccessLogEntry;
use showcase_core::types::DbId;
use sqlx::PgPool;

use crate::models::demo_access_log::DemoAccessLog;

const COLUMNS: &str = "id, demo_id, user_id, accessed_at, ip_address, user_agent";

/// Append-only access log. Rows go away with their demo (`ON DELETE CASCADE`).
pub struct DemoAccessLogRepo;

impl DemoAccessLogRepo {
    pub async fn create(pool: &PgPool, input: &NewAccessLogEntry) -> Result<DemoAccessLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO demo_access_logs (demo_id, user_id, ip_address, user_agent)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DemoAccessLog>(&query)
            .bind(input.demo_id)
            .bind(input.user_id)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .fetch_one(pool)
            .await
    }

    /// Access log of one demo, most recent first.
    pub async fn list_for_demo(pool: &PgPool, demo_id: DbId) -> Result<Vec<DemoAccessLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM demo_access_logs
             WHERE demo_id = $1
             ORDER BY accessed_at DESC, id DESC"
        );
        sqlx::query_as::<_, DemoAccessLog>(&query)
            .bind(demo_id)
            .fetch_all(pool)
            .await
    }
}
