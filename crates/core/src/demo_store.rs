//! Persistence boundary for demos, grants, and access logs.
//!
//! [`DemoRecordStore`] is the narrow capability set the deployment and access
//! code needs. The `db` crate implements it over PostgreSQL; tests use the
//! in-memory implementation in [`memory`].

use std::future::Future;

use serde::Serialize;

use crate::access::{AccessGrant, GrantAccess};
use crate::demo::{DemoProject, DemoSource, DemoStatus, NewDemoProject};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Errors raised by a [`DemoRecordStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage backend failed.
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A stored row violates the demo data model.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A uniqueness constraint rejected the write.
    #[error("Store conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => CoreError::Conflict(msg),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

/// The parts of a client project the demo subsystem reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectRef {
    pub id: DbId,
    /// The project's primary client (owner).
    pub client_id: DbId,
    /// Convenience pointer to the project's demo.
    pub demo_id: Option<DbId>,
}

/// Append-only record of a demo view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessLogEntry {
    pub id: DbId,
    pub demo_id: DbId,
    pub user_id: DbId,
    pub accessed_at: Timestamp,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Insert payload for an access log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccessLogEntry {
    pub demo_id: DbId,
    pub user_id: DbId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Status write. `None` fields keep their stored value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoStatusChange {
    pub status: DemoStatus,
    pub file_size_mb: Option<f64>,
    pub deployed_at: Option<Timestamp>,
}

impl DemoStatusChange {
    pub fn status(status: DemoStatus) -> Self {
        Self {
            status,
            file_size_mb: None,
            deployed_at: None,
        }
    }
}

/// Replacement of a demo's editable content. The mode of `source` must match
/// the stored record; callers check this before writing.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoContent {
    pub demo_name: String,
    pub source: DemoSource,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage capability set for the demo subsystem.
///
/// Every mutation of a demo record also refreshes its `last_updated`.
pub trait DemoRecordStore: Send + Sync {
    fn find_project(
        &self,
        project_id: DbId,
    ) -> impl Future<Output = StoreResult<Option<ProjectRef>>> + Send;

    /// Point the project at its demo (or clear the pointer).
    fn link_project_demo(
        &self,
        project_id: DbId,
        demo_id: Option<DbId>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn find_demo(&self, id: DbId) -> impl Future<Output = StoreResult<Option<DemoProject>>> + Send;

    fn find_demo_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = StoreResult<Option<DemoProject>>> + Send;

    fn find_demo_by_project(
        &self,
        project_id: DbId,
    ) -> impl Future<Output = StoreResult<Option<DemoProject>>> + Send;

    fn list_demos(&self) -> impl Future<Output = StoreResult<Vec<DemoProject>>> + Send;

    fn create_demo(
        &self,
        input: &NewDemoProject,
    ) -> impl Future<Output = StoreResult<DemoProject>> + Send;

    /// Returns `None` if the demo does not exist.
    fn update_demo_status(
        &self,
        id: DbId,
        change: DemoStatusChange,
    ) -> impl Future<Output = StoreResult<Option<DemoProject>>> + Send;

    /// Returns `None` if the demo does not exist.
    fn update_demo_content(
        &self,
        id: DbId,
        content: &DemoContent,
    ) -> impl Future<Output = StoreResult<Option<DemoProject>>> + Send;

    /// Hard delete. Returns `true` if a record was removed.
    fn delete_demo(&self, id: DbId) -> impl Future<Output = StoreResult<bool>> + Send;

    fn find_grant(
        &self,
        project_id: DbId,
        user_id: DbId,
    ) -> impl Future<Output = StoreResult<Option<AccessGrant>>> + Send;

    fn list_grants(
        &self,
        project_id: DbId,
    ) -> impl Future<Output = StoreResult<Vec<AccessGrant>>> + Send;

    /// Insert or replace the single grant for `(project_id, user_id)`.
    fn upsert_grant(
        &self,
        input: &GrantAccess,
    ) -> impl Future<Output = StoreResult<AccessGrant>> + Send;

    fn delete_grant(
        &self,
        project_id: DbId,
        user_id: DbId,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    fn log_access(
        &self,
        input: &NewAccessLogEntry,
    ) -> impl Future<Output = StoreResult<AccessLogEntry>> + Send;

    /// Most recent first.
    fn list_access_logs(
        &self,
        demo_id: DbId,
    ) -> impl Future<Output = StoreResult<Vec<AccessLogEntry>>> + Send;
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory [`DemoRecordStore`] for unit tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    struct Inner {
        next_id: DbId,
        projects: HashMap<DbId, ProjectRef>,
        demos: HashMap<DbId, DemoProject>,
        grants: HashMap<(DbId, DbId), AccessGrant>,
        logs: Vec<AccessLogEntry>,
    }

    impl Inner {
        fn next_id(&mut self) -> DbId {
            self.next_id += 1;
            self.next_id
        }
    }

    #[derive(Default)]
    pub struct MemoryDemoStore {
        inner: Mutex<Inner>,
    }

    impl MemoryDemoStore {
        pub fn with_project(project_id: DbId, client_id: DbId) -> Self {
            let store = Self::default();
            store.add_project(project_id, client_id);
            store
        }

        pub fn add_project(&self, project_id: DbId, client_id: DbId) {
            self.inner.lock().expect("lock").projects.insert(
                project_id,
                ProjectRef {
                    id: project_id,
                    client_id,
                    demo_id: None,
                },
            );
        }

        pub fn demo_count(&self) -> usize {
            self.inner.lock().expect("lock").demos.len()
        }

        pub fn project(&self, project_id: DbId) -> Option<ProjectRef> {
            self.inner.lock().expect("lock").projects.get(&project_id).copied()
        }
    }

    impl DemoRecordStore for MemoryDemoStore {
        async fn find_project(&self, project_id: DbId) -> StoreResult<Option<ProjectRef>> {
            Ok(self.project(project_id))
        }

        async fn link_project_demo(&self, project_id: DbId, demo_id: Option<DbId>) -> StoreResult<()> {
            let mut inner = self.inner.lock().expect("lock");
            if let Some(project) = inner.projects.get_mut(&project_id) {
                project.demo_id = demo_id;
            }
            Ok(())
        }

        async fn find_demo(&self, id: DbId) -> StoreResult<Option<DemoProject>> {
            Ok(self.inner.lock().expect("lock").demos.get(&id).cloned())
        }

        async fn find_demo_by_slug(&self, slug: &str) -> StoreResult<Option<DemoProject>> {
            let inner = self.inner.lock().expect("lock");
            Ok(inner.demos.values().find(|d| d.demo_slug == slug).cloned())
        }

        async fn find_demo_by_project(&self, project_id: DbId) -> StoreResult<Option<DemoProject>> {
            let inner = self.inner.lock().expect("lock");
            Ok(inner.demos.values().find(|d| d.project_id == project_id).cloned())
        }

        async fn list_demos(&self) -> StoreResult<Vec<DemoProject>> {
            let inner = self.inner.lock().expect("lock");
            let mut demos: Vec<_> = inner.demos.values().cloned().collect();
            demos.sort_by_key(|d| std::cmp::Reverse(d.id));
            Ok(demos)
        }

        async fn create_demo(&self, input: &NewDemoProject) -> StoreResult<DemoProject> {
            let mut inner = self.inner.lock().expect("lock");
            if inner.demos.values().any(|d| d.demo_slug == input.demo_slug) {
                return Err(StoreError::Conflict("uq_demo_projects_demo_slug".into()));
            }
            if inner.demos.values().any(|d| d.project_id == input.project_id) {
                return Err(StoreError::Conflict("uq_demo_projects_project_id".into()));
            }
            let id = inner.next_id();
            let now = Utc::now();
            let demo = DemoProject {
                id,
                project_id: input.project_id,
                demo_name: input.demo_name.clone(),
                demo_slug: input.demo_slug.clone(),
                source: input.source.clone(),
                status: input.status,
                file_size_mb: None,
                deployed_at: input.deployed_at,
                last_updated: now,
                created_at: now,
                created_by: input.created_by,
            };
            inner.demos.insert(id, demo.clone());
            Ok(demo)
        }

        async fn update_demo_status(
            &self,
            id: DbId,
            change: DemoStatusChange,
        ) -> StoreResult<Option<DemoProject>> {
            let mut inner = self.inner.lock().expect("lock");
            Ok(inner.demos.get_mut(&id).map(|demo| {
                demo.status = change.status;
                if change.file_size_mb.is_some() {
                    demo.file_size_mb = change.file_size_mb;
                }
                if change.deployed_at.is_some() {
                    demo.deployed_at = change.deployed_at;
                }
                demo.last_updated = Utc::now();
                demo.clone()
            }))
        }

        async fn update_demo_content(
            &self,
            id: DbId,
            content: &DemoContent,
        ) -> StoreResult<Option<DemoProject>> {
            let mut inner = self.inner.lock().expect("lock");
            Ok(inner.demos.get_mut(&id).map(|demo| {
                demo.demo_name = content.demo_name.clone();
                demo.source = content.source.clone();
                demo.last_updated = Utc::now();
                demo.clone()
            }))
        }

        async fn delete_demo(&self, id: DbId) -> StoreResult<bool> {
            let mut inner = self.inner.lock().expect("lock");
            inner.logs.retain(|l| l.demo_id != id);
            Ok(inner.demos.remove(&id).is_some())
        }

        async fn find_grant(&self, project_id: DbId, user_id: DbId) -> StoreResult<Option<AccessGrant>> {
            let inner = self.inner.lock().expect("lock");
            Ok(inner.grants.get(&(project_id, user_id)).cloned())
        }

        async fn list_grants(&self, project_id: DbId) -> StoreResult<Vec<AccessGrant>> {
            let inner = self.inner.lock().expect("lock");
            Ok(inner
                .grants
                .values()
                .filter(|g| g.project_id == project_id)
                .cloned()
                .collect())
        }

        async fn upsert_grant(&self, input: &GrantAccess) -> StoreResult<AccessGrant> {
            let grant = AccessGrant {
                project_id: input.project_id,
                user_id: input.user_id,
                access_level: input.access_level,
                permissions: input.permissions,
                granted_by: input.granted_by,
                granted_at: Utc::now(),
            };
            self.inner
                .lock()
                .expect("lock")
                .grants
                .insert((input.project_id, input.user_id), grant.clone());
            Ok(grant)
        }

        async fn delete_grant(&self, project_id: DbId, user_id: DbId) -> StoreResult<bool> {
            let mut inner = self.inner.lock().expect("lock");
            Ok(inner.grants.remove(&(project_id, user_id)).is_some())
        }

        async fn log_access(&self, input: &NewAccessLogEntry) -> StoreResult<AccessLogEntry> {
            let mut inner = self.inner.lock().expect("lock");
            let entry = AccessLogEntry {
                id: inner.next_id(),
                demo_id: input.demo_id,
                user_id: input.user_id,
                accessed_at: Utc::now(),
                ip_address: input.ip_address.clone(),
                user_agent: input.user_agent.clone(),
            };
            inner.logs.push(entry.clone());
            Ok(entry)
        }

        async fn list_access_logs(&self, demo_id: DbId) -> StoreResult<Vec<AccessLogEntry>> {
            let inner = self.inner.lock().expect("lock");
            Ok(inner
                .logs
                .iter()
                .rev()
                .filter(|l| l.demo_id == demo_id)
                .cloned()
                .collect())
        }
    }
}
