//! Client project model and DTOs.

use serde::{Deserialize, Serialize};
use showcase_core::demo_store::ProjectRef;
use showcase_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub client_id: DbId,
    pub demo_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Project> for ProjectRef {
    fn from(row: Project) -> Self {
        ProjectRef {
            id: row.id,
            client_id: row.client_id,
            demo_id: row.demo_id,
        }
    }
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub client_id: DbId,
}
