//! Demo access log model.

use showcase_core::demo_store::AccessLogEntry;
use showcase_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the append-only `demo_access_logs` table.
#[derive(Debug, Clone, FromRow)]
pub struct DemoAccessLog {
    pub id: DbId,
    pub demo_id: DbId,
    pub user_id: DbId,
    pub accessed_at: Timestamp,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl From<DemoAccessLog> for AccessLogEntry {
    fn from(row: DemoAccessLog) -> Self {
        AccessLogEntry {
            id: row.id,
            demo_id: row.demo_id,
            user_id: row.user_id,
            accessed_at: row.accessed_at,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
        }
    }
}
