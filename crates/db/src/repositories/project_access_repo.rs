//! Repository for the `project_access` table.

use showcase_core::access::GrantAccess;
use showcase_core::types::DbId;
use sqlx::PgPool;

use crate::models::project_access::ProjectAccessRow;

const COLUMNS: &str = "project_id, user_id, access_level, view_demo, view_files, \
                       comment, approve, download, granted_by, granted_at";

/// Provides CRUD operations for explicit project access grants.
pub struct ProjectAccessRepo;

impl ProjectAccessRepo {
    pub async fn find(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<Option<ProjectAccessRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_access WHERE project_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, ProjectAccessRow>(&query)
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// All grants of a project, oldest first.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<ProjectAccessRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_access WHERE project_id = $1 ORDER BY granted_at, id"
        );
        sqlx::query_as::<_, ProjectAccessRow>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Insert the grant, or replace the level and permissions of the existing
    /// grant for the same `(project_id, user_id)`.
    pub async fn upsert(pool: &PgPool, input: &GrantAccess) -> Result<ProjectAccessRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_access
                (project_id, user_id, access_level, view_demo, view_files, comment, approve, download, granted_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT ON CONSTRAINT uq_project_access_project_user DO UPDATE SET
                access_level = EXCLUDED.access_level,
                view_demo = EXCLUDED.view_demo,
                view_files = EXCLUDED.view_files,
                comment = EXCLUDED.comment,
                approve = EXCLUDED.approve,
                download = EXCLUDED.download,
                granted_by = EXCLUDED.granted_by,
                granted_at = NOW()
             RETURNING {COLUMNS}"
        );
        let perms = input.permissions;
        sqlx::query_as::<_, ProjectAccessRow>(&query)
            .bind(input.project_id)
            .bind(input.user_id)
            .bind(input.access_level.as_str())
            .bind(perms.view_demo)
            .bind(perms.view_files)
            .bind(perms.comment)
            .bind(perms.approve)
            .bind(perms.download)
            .bind(input.granted_by)
            .fetch_one(pool)
            .await
    }

    /// Remove a grant. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, project_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_access WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
