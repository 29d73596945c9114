//! [`DemoRecordStore`] over PostgreSQL.

use showcase_core::access::{AccessGrant, GrantAccess};
use showcase_core::demo::{DemoProject, NewDemoProject};
use showcase_core::demo_store::{
    AccessLogEntry, DemoContent, DemoRecordStore, DemoStatusChange, NewAccessLogEntry, ProjectRef,
    StoreError, StoreResult,
};
use showcase_core::types::DbId;
use sqlx::PgPool;

use crate::repositories::{DemoAccessLogRepo, DemoProjectRepo, ProjectAccessRepo, ProjectRepo};

/// PostgreSQL unique-violation error code.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL foreign-key-violation error code.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Demo store backed by a connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PgDemoStore {
    pool: PgPool,
}

impl PgDemoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a sqlx error onto the store taxonomy.
///
/// Unique and foreign-key violations become [`StoreError::Conflict`] carrying
/// the constraint name.
pub fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let code = db_err.code();
        if matches!(code.as_deref(), Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION)) {
            let constraint = db_err.constraint().unwrap_or("unknown constraint");
            return StoreError::Conflict(format!("{constraint}: {}", db_err.message()));
        }
    }
    StoreError::Backend(err.to_string())
}

fn demo_from_row<R>(row: Option<R>) -> StoreResult<Option<DemoProject>>
where
    DemoProject: TryFrom<R, Error = StoreError>,
{
    row.map(DemoProject::try_from).transpose()
}

impl DemoRecordStore for PgDemoStore {
    async fn find_project(&self, project_id: DbId) -> StoreResult<Option<ProjectRef>> {
        let project = ProjectRepo::find_by_id(&self.pool, project_id)
            .await
            .map_err(store_error)?;
        Ok(project.map(ProjectRef::from))
    }

    async fn link_project_demo(&self, project_id: DbId, demo_id: Option<DbId>) -> StoreResult<()> {
        ProjectRepo::set_demo(&self.pool, project_id, demo_id)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn find_demo(&self, id: DbId) -> StoreResult<Option<DemoProject>> {
        demo_from_row(DemoProjectRepo::find_by_id(&self.pool, id).await.map_err(store_error)?)
    }

    async fn find_demo_by_slug(&self, slug: &str) -> StoreResult<Option<DemoProject>> {
        demo_from_row(DemoProjectRepo::find_by_slug(&self.pool, slug).await.map_err(store_error)?)
    }

    async fn find_demo_by_project(&self, project_id: DbId) -> StoreResult<Option<DemoProject>> {
        demo_from_row(
            DemoProjectRepo::find_by_project(&self.pool, project_id)
                .await
                .map_err(store_error)?,
        )
    }

    async fn list_demos(&self) -> StoreResult<Vec<DemoProject>> {
        DemoProjectRepo::list(&self.pool)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(DemoProject::try_from)
            .collect()
    }

    async fn create_demo(&self, input: &NewDemoProject) -> StoreResult<DemoProject> {
        let row = DemoProjectRepo::create(&self.pool, input)
            .await
            .map_err(store_error)?;
        DemoProject::try_from(row)
    }

    async fn update_demo_status(
        &self,
        id: DbId,
        change: DemoStatusChange,
    ) -> StoreResult<Option<DemoProject>> {
        demo_from_row(
            DemoProjectRepo::update_status(&self.pool, id, &change)
                .await
                .map_err(store_error)?,
        )
    }

    async fn update_demo_content(
        &self,
        id: DbId,
        content: &DemoContent,
    ) -> StoreResult<Option<DemoProject>> {
        demo_from_row(
            DemoProjectRepo::update_content(&self.pool, id, content)
                .await
                .map_err(store_error)?,
        )
    }

    async fn delete_demo(&self, id: DbId) -> StoreResult<bool> {
        DemoProjectRepo::delete(&self.pool, id).await.map_err(store_error)
    }

    async fn find_grant(&self, project_id: DbId, user_id: DbId) -> StoreResult<Option<AccessGrant>> {
        ProjectAccessRepo::find(&self.pool, project_id, user_id)
            .await
            .map_err(store_error)?
            .map(AccessGrant::try_from)
            .transpose()
    }

    async fn list_grants(&self, project_id: DbId) -> StoreResult<Vec<AccessGrant>> {
        ProjectAccessRepo::list_for_project(&self.pool, project_id)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(AccessGrant::try_from)
            .collect()
    }

    async fn upsert_grant(&self, input: &GrantAccess) -> StoreResult<AccessGrant> {
        let row = ProjectAccessRepo::upsert(&self.pool, input)
            .await
            .map_err(store_error)?;
        AccessGrant::try_from(row)
    }

    async fn delete_grant(&self, project_id: DbId, user_id: DbId) -> StoreResult<bool> {
        ProjectAccessRepo::delete(&self.pool, project_id, user_id)
            .await
            .map_err(store_error)
    }

    async fn log_access(&self, input: &NewAccessLogEntry) -> StoreResult<AccessLogEntry> {
        let row = DemoAccessLogRepo::create(&self.pool, input)
            .await
            .map_err(store_error)?;
        Ok(row.into())
    }

    async fn list_access_logs(&self, demo_id: DbId) -> StoreResult<Vec<AccessLogEntry>> {
        let rows = DemoAccessLogRepo::list_for_demo(&self.pool, demo_id)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(AccessLogEntry::from).collect())
    }
}
