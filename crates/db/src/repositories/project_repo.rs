//! Repository for the `projects` table.

use showcase_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, client_id, demo_id, created_at, updated_at";

/// Provides project reads and maintenance of the demo pointer.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (name, client_id)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(input.client_id)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Point the project at `demo_id` (or clear it). Returns `true` if the
    /// project exists.
    pub async fn set_demo(
        pool: &PgPool,
        id: DbId,
        demo_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE projects SET demo_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(demo_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
