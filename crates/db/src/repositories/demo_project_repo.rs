//! Repository for the `demo_projects` table.

use showcase_core::demo::NewDemoProject;
use showcase_core::demo_store::{DemoContent, DemoStatusChange};
use showcase_core::types::DbId;
use sqlx::PgPool;

use crate::models::demo_project::{DemoProjectRow, SourceColumns};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, demo_name, demo_slug, demo_type, demo_path, build_type, \
                       external_url, external_description, status, file_size_mb, deployed_at, \
                       last_updated, created_at, created_by";

/// Provides CRUD operations for demo projects.
///
/// Every update refreshes `last_updated`.
pub struct DemoProjectRepo;

impl DemoProjectRepo {
    /// Insert a new demo, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewDemoProject) -> Result<DemoProjectRow, sqlx::Error> {
        let cols = SourceColumns::from(&input.source);
        let query = format!(
            "INSERT INTO demo_projects
                (project_id, demo_name, demo_slug, demo_type, demo_path, build_type,
                 external_url, external_description, status, deployed_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DemoProjectRow>(&query)
            .bind(input.project_id)
            .bind(&input.demo_name)
            .bind(&input.demo_slug)
            .bind(cols.demo_type)
            .bind(cols.demo_path)
            .bind(cols.build_type)
            .bind(cols.external_url)
            .bind(cols.external_description)
            .bind(input.status.as_str())
            .bind(input.deployed_at)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DemoProjectRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM demo_projects WHERE id = $1");
        sqlx::query_as::<_, DemoProjectRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<DemoProjectRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM demo_projects WHERE demo_slug = $1");
        sqlx::query_as::<_, DemoProjectRow>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Option<DemoProjectRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM demo_projects WHERE project_id = $1");
        sqlx::query_as::<_, DemoProjectRow>(&query)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// List all demos, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<DemoProjectRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM demo_projects ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, DemoProjectRow>(&query).fetch_all(pool).await
    }

    /// Set the status. `None` fields of `change` keep their stored value.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        change: &DemoStatusChange,
    ) -> Result<Option<DemoProjectRow>, sqlx::Error> {
        let query = format!(
            "UPDATE demo_projects SET
                status = $2,
                file_size_mb = COALESCE($3, file_size_mb),
                deployed_at = COALESCE($4, deployed_at),
                last_updated = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DemoProjectRow>(&query)
            .bind(id)
            .bind(change.status.as_str())
            .bind(change.file_size_mb)
            .bind(change.deployed_at)
            .fetch_optional(pool)
            .await
    }

    /// Replace name and mode-specific columns. `demo_type` is part of the
    /// filter, so a mode change matches no row.
    pub async fn update_content(
        pool: &PgPool,
        id: DbId,
        content: &DemoContent,
    ) -> Result<Option<DemoProjectRow>, sqlx::Error> {
        let cols = SourceColumns::from(&content.source);
        let query = format!(
            "UPDATE demo_projects SET
                demo_name = $2,
                demo_path = $4,
                build_type = $5,
                external_url = $6,
                external_description = $7,
                last_updated = NOW()
             WHERE id = $1 AND demo_type = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DemoProjectRow>(&query)
            .bind(id)
            .bind(&content.demo_name)
            .bind(cols.demo_type)
            .bind(cols.demo_path)
            .bind(cols.build_type)
            .bind(cols.external_url)
            .bind(cols.external_description)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a demo. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM demo_projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
