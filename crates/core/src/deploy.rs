//! Deployment orchestration for integrated and external demos.
//!
//! [`DeploymentOrchestrator`] owns the record lifecycle around a deployment:
//! slug allocation, record creation, file staging, the ready/error transition
//! and the project's demo pointer. Deployments to the same project are
//! serialized with a per-project async mutex; the store's unique constraint on
//! `project_id` backs this up across processes.
//!
//! Once a record exists, a failed deployment always leaves it in `error`. This
//! holds even when the caller stops waiting: a project lease dropped while
//! its record is `building` marks the record `error` in a background task.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;

use crate::demo::{
    demo_public_url, demo_storage_path, validate_demo_name, validate_external_url, BuildType,
    DemoEvent, DemoProject, DemoSource, DemoStatus, DemoType, NewDemoProject, UpdateDemo,
};
use crate::demo_store::{DemoContent, DemoRecordStore, DemoStatusChange};
use crate::error::CoreError;
use crate::slug::{disambiguated_slug, fallback_slug, slugify};
use crate::staging::{self, CopyReport, StagingError, StagingPolicy};
use crate::types::DbId;

/// Upper bound on slug candidates tried before giving up.
const MAX_SLUG_ATTEMPTS: u32 = 50;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Filesystem and addressing settings for deployments.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    /// Root directory demos are staged under.
    pub demo_root: PathBuf,
    /// Prefix of generated viewer URLs.
    pub public_base_url: String,
    pub policy: StagingPolicy,
}

/// Request to stage a local build as an integrated demo.
#[derive(Debug, Clone)]
pub struct IntegratedDeployment {
    pub project_id: DbId,
    pub demo_name: String,
    pub build_type: BuildType,
    pub source_path: PathBuf,
    pub requested_by: DbId,
}

/// Request to register an externally hosted demo.
#[derive(Debug, Clone)]
pub struct ExternalDeployment {
    pub project_id: DbId,
    pub demo_name: String,
    pub external_url: String,
    pub external_description: Option<String>,
    pub requested_by: DbId,
}

/// Outcome of a deployment as reported to the admin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

/// A deployment that failed, with the record it left behind (if any).
struct Failed {
    demo_id: Option<DbId>,
    error: CoreError,
}

impl From<CoreError> for Failed {
    fn from(error: CoreError) -> Self {
        Self {
            demo_id: None,
            error,
        }
    }
}

/// Blocking staging run: the copy report and the staged size in bytes.
type StagingTask = JoinHandle<Result<(CopyReport, u64), StagingError>>;

type LockMap = Arc<Mutex<HashMap<DbId, Arc<tokio::sync::Mutex<()>>>>>;

/// A deployment that finished with the record in `ready`.
struct Deployed {
    demo: DemoProject,
    warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct DeploymentOrchestrator<S> {
    store: Arc<S>,
    settings: DeploySettings,
    locks: LockMap,
}

impl<S: DemoRecordStore + 'static> DeploymentOrchestrator<S> {
    pub fn new(store: Arc<S>, settings: DeploySettings) -> Self {
        Self {
            store,
            settings,
            locks: LockMap::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    pub async fn deploy(&self, request: DeploymentRequest) -> DeploymentResult {
        match request {
            DeploymentRequest::Integrated(req) => self.deploy_integrated(req).await,
            DeploymentRequest::External(req) => self.deploy_external(req).await,
        }
    }

    /// Stage `req.source_path` as the project's integrated demo.
    ///
    /// A project that already has an integrated demo is restaged in place,
    /// keeping its id and slug.
    pub async fn deploy_integrated(&self, req: IntegratedDeployment) -> DeploymentResult {
        let mut lease = self.lock_project(req.project_id).await;
        let outcome = self.run_integrated(&req, &mut lease).await;
        self.finish(req.project_id, outcome).await
    }

    /// Register `req.external_url` as the project's external demo.
    ///
    /// The URL is validated before anything is written.
    pub async fn deploy_external(&self, req: ExternalDeployment) -> DeploymentResult {
        let _lease = self.lock_project(req.project_id).await;
        let outcome = self.run_external(&req).await;
        self.finish(req.project_id, outcome).await
    }

    /// Restage an existing integrated demo from `source_path`.
    ///
    /// `build_type` defaults to the demo's current build type.
    pub async fn redeploy_integrated(
        &self,
        demo_id: DbId,
        build_type: Option<BuildType>,
        source_path: &Path,
    ) -> DeploymentResult {
        let project_id = match self.find_demo(demo_id).await {
            Ok(demo) => demo.project_id,
            Err(error) => return failure_result(None, &error),
        };
        let mut lease = self.lock_project(project_id).await;

        let outcome = async {
            let demo = self.find_demo(demo_id).await?;
            let current = match &demo.source {
                DemoSource::Integrated { build_type, .. } => *build_type,
                DemoSource::External { .. } => {
                    return Err(Failed::from(CoreError::Validation(
                        "External demos have no files to redeploy".into(),
                    )));
                }
            };
            let build_type = build_type.unwrap_or(current);
            self.check_source(source_path).await?;
            self.restage(demo, None, build_type, source_path, &mut lease)
                .await
        }
        .await;
        self.finish(project_id, outcome).await
    }

    /// Edit a demo's name or external link. Mode and slug never change.
    pub async fn update_demo(&self, id: DbId, update: UpdateDemo) -> Result<DemoProject, CoreError> {
        let demo = self.find_demo(id).await?;
        let _lease = self.lock_project(demo.project_id).await;
        let demo = self.find_demo(id).await?;
        let demo_name = match update.demo_name.as_deref() {
            Some(name) => validate_demo_name(name)?,
            None => demo.demo_name.clone(),
        };

        let source = match &demo.source {
            DemoSource::Integrated { .. } => {
                if update.external_url.is_some() || update.external_description.is_some() {
                    return Err(CoreError::Validation(
                        "Integrated demos have no external link; delete and recreate to switch modes"
                            .into(),
                    ));
                }
                demo.source.clone()
            }
            DemoSource::External {
                external_url,
                external_description,
            } => DemoSource::External {
                external_url: match update.external_url.as_deref() {
                    Some(url) => validate_external_url(url)?,
                    None => external_url.clone(),
                },
                external_description: match update.external_description {
                    Some(text) if text.trim().is_empty() => None,
                    Some(text) => Some(text),
                    None => external_description.clone(),
                },
            },
        };

        let updated = self
            .store
            .update_demo_content(id, &DemoContent { demo_name, source })
            .await?
            .ok_or(CoreError::NotFound { entity: "Demo", id })?;
        tracing::info!(demo_id = id, slug = %updated.demo_slug, "Demo updated");
        Ok(updated)
    }

    /// Take a ready demo offline (`ready -> archived`).
    pub async fn disable_demo(&self, id: DbId) -> Result<DemoProject, CoreError> {
        let demo = self.find_demo(id).await?;
        let _lease = self.lock_project(demo.project_id).await;
        let demo = self.find_demo(id).await?;

        let next = demo.status.apply(DemoEvent::Disabled)?;
        let updated = self
            .store
            .update_demo_status(id, DemoStatusChange::status(next))
            .await?
            .ok_or(CoreError::NotFound { entity: "Demo", id })?;
        tracing::info!(demo_id = id, project_id = demo.project_id, "Demo disabled");
        Ok(updated)
    }

    /// Delete a demo, its staged files and its access logs.
    ///
    /// File removal failures are logged; the record is deleted regardless.
    pub async fn delete_demo(&self, id: DbId) -> Result<(), CoreError> {
        let demo = self.find_demo(id).await?;
        let _lease = self.lock_project(demo.project_id).await;

        if let Some(path) = demo.demo_path() {
            let dir = self.settings.demo_root.join(path);
            let removal = tokio::task::spawn_blocking(move || staging::remove_demo_dir(&dir))
                .await
                .map_err(|e| StagingError::Task(e.to_string()))
                .and_then(|r| r);
            if let Err(err) = removal {
                tracing::warn!(demo_id = id, error = %err, "Failed to remove demo files");
            }
        }

        let pointed_here = self
            .store
            .find_project(demo.project_id)
            .await?
            .is_some_and(|p| p.demo_id == Some(id));
        if pointed_here {
            if let Err(err) = self.store.link_project_demo(demo.project_id, None).await {
                tracing::warn!(
                    demo_id = id,
                    project_id = demo.project_id,
                    error = %err,
                    "Failed to clear project demo link",
                );
            }
        }

        if !self.store.delete_demo(id).await? {
            return Err(CoreError::NotFound { entity: "Demo", id });
        }
        tracing::info!(demo_id = id, project_id = demo.project_id, slug = %demo.demo_slug, "Demo deleted");
        Ok(())
    }

    /// Pick a slug for a new demo of `project_id` named `demo_name`.
    ///
    /// A slug already owned by the same project is reused; otherwise the
    /// project id and then a sequence number are appended until it is free.
    pub async fn allocate_slug(&self, demo_name: &str, project_id: DbId) -> Result<String, CoreError> {
        let base = match slugify(demo_name) {
            slug if slug.is_empty() => fallback_slug(project_id),
            slug => slug,
        };

        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let candidate = disambiguated_slug(&base, project_id, attempt);
            match self.store.find_demo_by_slug(&candidate).await? {
                None => return Ok(candidate),
                Some(existing) if existing.project_id == project_id => return Ok(candidate),
                Some(_) => continue,
            }
        }

        Err(CoreError::Conflict(format!(
            "Could not allocate a free slug for '{base}'"
        )))
    }

    // -- flows -------------------------------------------------------------

    async fn run_integrated(
        &self,
        req: &IntegratedDeployment,
        lease: &mut ProjectLease<S>,
    ) -> Result<Deployed, Failed> {
        let demo_name = validate_demo_name(&req.demo_name)?;
        self.check_source(&req.source_path).await?;
        self.require_project(req.project_id).await?;

        let existing = self
            .store
            .find_demo_by_project(req.project_id)
            .await
            .map_err(CoreError::from)?;
        if let Some(existing) = existing {
            if existing.demo_type() != DemoType::Integrated {
                return Err(mode_conflict(existing.demo_type()).into());
            }
            return self
                .restage(existing, Some(demo_name), req.build_type, &req.source_path, lease)
                .await;
        }

        let slug = self.allocate_slug(&demo_name, req.project_id).await?;
        let demo = self
            .store
            .create_demo(&NewDemoProject {
                project_id: req.project_id,
                demo_name,
                source: DemoSource::Integrated {
                    demo_path: demo_storage_path(req.project_id, &slug),
                    build_type: req.build_type,
                },
                demo_slug: slug,
                status: DemoStatus::Building,
                deployed_at: None,
                created_by: req.requested_by,
            })
            .await
            .map_err(CoreError::from)?;
        tracing::info!(
            demo_id = demo.id,
            project_id = req.project_id,
            slug = %demo.demo_slug,
            build_type = %req.build_type,
            "Integrated demo created",
        );
        lease.arm(demo.id);

        self.stage_or_fail(demo, req.build_type, &req.source_path, lease)
            .await
    }

    async fn run_external(&self, req: &ExternalDeployment) -> Result<Deployed, Failed> {
        let demo_name = validate_demo_name(&req.demo_name)?;
        let external_url = validate_external_url(&req.external_url)?;
        let external_description = req
            .external_description
            .clone()
            .filter(|text| !text.trim().is_empty());
        self.require_project(req.project_id).await?;

        let source = DemoSource::External {
            external_url,
            external_description,
        };

        let existing = self
            .store
            .find_demo_by_project(req.project_id)
            .await
            .map_err(CoreError::from)?;
        if let Some(existing) = existing {
            if existing.demo_type() != DemoType::External {
                return Err(mode_conflict(existing.demo_type()).into());
            }
            let next = existing.status.apply(DemoEvent::Relinked)?;
            self.store
                .update_demo_content(existing.id, &DemoContent { demo_name, source })
                .await
                .map_err(CoreError::from)?;
            let demo = self
                .store
                .update_demo_status(
                    existing.id,
                    DemoStatusChange {
                        status: next,
                        file_size_mb: None,
                        deployed_at: Some(Utc::now()),
                    },
                )
                .await
                .map_err(CoreError::from)?
                .ok_or(CoreError::NotFound {
                    entity: "Demo",
                    id: existing.id,
                })?;
            tracing::info!(demo_id = demo.id, project_id = req.project_id, "External demo relinked");
            return Ok(Deployed {
                demo,
                warnings: Vec::new(),
            });
        }

        let slug = self.allocate_slug(&demo_name, req.project_id).await?;
        let demo = self
            .store
            .create_demo(&NewDemoProject {
                project_id: req.project_id,
                demo_name,
                demo_slug: slug,
                source,
                status: DemoStatus::Ready,
                deployed_at: Some(Utc::now()),
                created_by: req.requested_by,
            })
            .await
            .map_err(CoreError::from)?;
        tracing::info!(
            demo_id = demo.id,
            project_id = req.project_id,
            slug = %demo.demo_slug,
            "External demo created",
        );
        Ok(Deployed {
            demo,
            warnings: Vec::new(),
        })
    }

    /// Move an existing integrated demo back to `building` and restage it.
    async fn restage(
        &self,
        demo: DemoProject,
        demo_name: Option<String>,
        build_type: BuildType,
        source_path: &Path,
        lease: &mut ProjectLease<S>,
    ) -> Result<Deployed, Failed> {
        let next = demo.status.apply(DemoEvent::StagingStarted)?;
        let demo_path = demo
            .demo_path()
            .map(str::to_string)
            .unwrap_or_else(|| demo_storage_path(demo.project_id, &demo.demo_slug));

        self.store
            .update_demo_content(
                demo.id,
                &DemoContent {
                    demo_name: demo_name.unwrap_or_else(|| demo.demo_name.clone()),
                    source: DemoSource::Integrated {
                        demo_path,
                        build_type,
                    },
                },
            )
            .await
            .map_err(CoreError::from)?;
        lease.arm(demo.id);
        let building = self
            .store
            .update_demo_status(demo.id, DemoStatusChange::status(next))
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "Demo",
                id: demo.id,
            })?;
        tracing::info!(demo_id = demo.id, slug = %demo.demo_slug, %build_type, "Restaging demo");

        self.stage_or_fail(building, build_type, source_path, lease)
            .await
    }

    /// Stage files for a `building` record, marking it `error` on failure.
    async fn stage_or_fail(
        &self,
        demo: DemoProject,
        build_type: BuildType,
        source_path: &Path,
        lease: &mut ProjectLease<S>,
    ) -> Result<Deployed, Failed> {
        let staged = self
            .stage_and_mark_ready(&demo, build_type, source_path, lease)
            .await;
        let outcome = match staged {
            Ok(deployed) => Ok(deployed),
            Err(error) => {
                self.mark_failed(&demo, &error).await;
                Err(Failed {
                    demo_id: Some(demo.id),
                    error,
                })
            }
        };
        lease.settle();
        outcome
    }

    async fn stage_and_mark_ready(
        &self,
        demo: &DemoProject,
        build_type: BuildType,
        source_path: &Path,
        lease: &mut ProjectLease<S>,
    ) -> Result<Deployed, CoreError> {
        let demo_path = demo.demo_path().ok_or_else(|| {
            CoreError::Internal(format!("Demo {} has no storage path", demo.id))
        })?;
        let dest = self.settings.demo_root.join(demo_path);

        let (report, size_bytes) = self
            .stage(build_type, source_path.to_path_buf(), dest, lease)
            .await?;
        let ready = demo.status.apply(DemoEvent::StagingSucceeded)?;
        let file_size_mb = staging::bytes_to_mb(size_bytes);

        let updated = self
            .store
            .update_demo_status(
                demo.id,
                DemoStatusChange {
                    status: ready,
                    file_size_mb: Some(file_size_mb),
                    deployed_at: Some(Utc::now()),
                },
            )
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Demo",
                id: demo.id,
            })?;

        let mut warnings = report.warnings;
        if report.placeholder_index {
            warnings.push(format!(
                "Build output had no index.html; a placeholder page was generated for this {build_type} demo"
            ));
        }
        tracing::info!(
            demo_id = demo.id,
            slug = %demo.demo_slug,
            files = report.files_copied,
            skipped = report.skipped.len(),
            file_size_mb,
            "Demo staged",
        );
        Ok(Deployed {
            demo: updated,
            warnings,
        })
    }

    /// Copy the build into `dest`, replacing whatever was staged there.
    ///
    /// The blocking copy is parked on `lease` while it runs, so an abandoned
    /// deployment can wait for it before marking the record.
    async fn stage(
        &self,
        build_type: BuildType,
        source: PathBuf,
        dest: PathBuf,
        lease: &mut ProjectLease<S>,
    ) -> Result<(CopyReport, u64), StagingError> {
        let policy = self.settings.policy.clone();
        let task = tokio::task::spawn_blocking(move || {
            if !source.is_dir() {
                return Err(StagingError::SourceMissing(source));
            }
            staging::remove_demo_dir(&dest)?;
            let report = staging::stage_build(build_type, &source, &dest, &policy)?;
            let size = staging::directory_size_bytes(&dest)?;
            Ok((report, size))
        });
        lease.join_staging(task).await
    }

    /// Reject a build source that overlaps the demo root before any record is
    /// touched.
    async fn check_source(&self, source: &Path) -> Result<(), CoreError> {
        let source = source.to_path_buf();
        let root = self.settings.demo_root.clone();
        tokio::task::spawn_blocking(move || staging::ensure_disjoint(&source, &root))
            .await
            .map_err(|e| StagingError::Task(e.to_string()))??;
        Ok(())
    }

    async fn mark_failed(&self, demo: &DemoProject, error: &CoreError) {
        tracing::error!(demo_id = demo.id, slug = %demo.demo_slug, error = %error, "Demo deployment failed");
        let change = DemoStatusChange::status(DemoStatus::Error);
        if let Err(err) = self.store.update_demo_status(demo.id, change).await {
            tracing::error!(demo_id = demo.id, error = %err, "Failed to mark demo as errored");
        }
    }

    // -- helpers -----------------------------------------------------------

    /// Turn a flow outcome into a result, pointing the project at the demo on
    /// success. A failed link is reported as a warning; the demo stays ready.
    async fn finish(&self, project_id: DbId, outcome: Result<Deployed, Failed>) -> DeploymentResult {
        let Deployed { demo, mut warnings } = match outcome {
            Ok(deployed) => deployed,
            Err(failed) => {
                tracing::warn!(project_id, error = %failed.error, "Deployment rejected");
                return failure_result(failed.demo_id, &failed.error);
            }
        };

        if let Err(err) = self.store.link_project_demo(project_id, Some(demo.id)).await {
            tracing::warn!(project_id, demo_id = demo.id, error = %err, "Failed to link project to demo");
            warnings.push(format!("Demo is live but the project link was not updated: {err}"));
        }

        DeploymentResult {
            success: true,
            demo_id: Some(demo.id),
            demo_url: Some(demo_public_url(&self.settings.public_base_url, &demo.demo_slug)),
            error: None,
            warnings,
        }
    }

    async fn lock_project(&self, project_id: DbId) -> ProjectLease<S> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(project_id).or_default())
        };
        let guard = lock.lock_owned().await;
        ProjectLease {
            project_id,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
            store: Arc::clone(&self.store),
            building: None,
            staging: None,
        }
    }

    async fn require_project(&self, project_id: DbId) -> Result<(), CoreError> {
        self.store
            .find_project(project_id)
            .await?
            .map(|_| ())
            .ok_or(CoreError::NotFound {
                entity: "Project",
                id: project_id,
            })
    }

    async fn find_demo(&self, id: DbId) -> Result<DemoProject, CoreError> {
        self.store
            .find_demo(id)
            .await?
            .ok_or(CoreError::NotFound { entity: "Demo", id })
    }
}

// ---------------------------------------------------------------------------
// Project lease
// ---------------------------------------------------------------------------

/// Exclusive hold on one project's deployments.
///
/// While a record is `building` the lease is armed. Dropping an armed lease
/// (the caller gave up mid-deploy) spawns a task that waits for any running
/// copy, marks the record `error`, and only then releases the project.
struct ProjectLease<S: DemoRecordStore + 'static> {
    project_id: DbId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
    store: Arc<S>,
    building: Option<DbId>,
    staging: Option<StagingTask>,
}

impl<S: DemoRecordStore + 'static> ProjectLease<S> {
    fn arm(&mut self, demo_id: DbId) {
        self.building = Some(demo_id);
    }

    /// The record reached `ready` or `error`; nothing is left to clean up.
    fn settle(&mut self) {
        self.building = None;
    }

    async fn join_staging(&mut self, task: StagingTask) -> Result<(CopyReport, u64), StagingError> {
        let joined = self.staging.insert(task).await;
        self.staging = None;
        joined.map_err(|e| StagingError::Task(e.to_string()))?
    }
}

impl<S: DemoRecordStore + 'static> Drop for ProjectLease<S> {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let project_id = self.project_id;
        let locks = Arc::clone(&self.locks);
        let Some(demo_id) = self.building.take() else {
            release_lock(&locks, guard);
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(demo_id, project_id, "Deployment abandoned outside a runtime; demo left building");
            release_lock(&locks, guard);
            return;
        };

        tracing::warn!(demo_id, project_id, "Deployment abandoned while staging");
        let store = Arc::clone(&self.store);
        let staging = self.staging.take();
        runtime.spawn(async move {
            if let Some(task) = staging {
                let _ = task.await;
            }
            let change = DemoStatusChange::status(DemoStatus::Error);
            if let Err(err) = store.update_demo_status(demo_id, change).await {
                tracing::error!(demo_id, error = %err, "Failed to mark abandoned demo as errored");
            }
            release_lock(&locks, guard);
        });
    }
}

/// Release a project lock and forget every lock nobody holds or waits on.
fn release_lock(locks: &LockMap, guard: OwnedMutexGuard<()>) {
    drop(guard);
    let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
}

/// Either kind of deployment request.
#[derive(Debug, Clone)]
pub enum DeploymentRequest {
    Integrated(IntegratedDeployment),
    External(ExternalDeployment),
}

impl DeploymentRequest {
    pub fn project_id(&self) -> DbId {
        match self {
            Self::Integrated(req) => req.project_id,
            Self::External(req) => req.project_id,
        }
    }
}

fn failure_result(demo_id: Option<DbId>, error: &CoreError) -> DeploymentResult {
    DeploymentResult {
        success: false,
        demo_id,
        demo_url: None,
        error: Some(error.to_string()),
        warnings: Vec::new(),
    }
}

fn mode_conflict(existing: DemoType) -> CoreError {
    CoreError::Conflict(format!(
        "Project already has an {existing} demo; delete it and recreate to switch modes"
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
