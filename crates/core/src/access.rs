//! Project access levels, permission sets, and access resolution.
//!
//! One access-level scheme is used throughout: `owner`, `collaborator`,
//! `viewer`. Grants recorded under the older `viewer`/`client`/`editor`/`admin`
//! vocabulary are mapped with [`AccessLevel::from_legacy`].
//!
//! Resolution order for a regular user ([`resolve_access`]):
//!
//! 1. The project's primary client is the owner and gets every permission.
//!    This cannot be revoked through grants.
//! 2. Otherwise an explicit grant for `(project, user)` is returned verbatim.
//! 3. Otherwise there is no access.
//!
//! Admins are not handled here. Admin endpoints check the role before they
//! ever call into resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::demo_store::DemoRecordStore;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Effective access level of a user on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Owner,
    Collaborator,
    Viewer,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Collaborator => "collaborator",
            Self::Viewer => "viewer",
        }
    }

    /// Map a level from the legacy project-access vocabulary.
    pub fn from_legacy(level: &str) -> Result<Self, CoreError> {
        match level {
            "viewer" => Ok(Self::Viewer),
            "client" | "editor" => Ok(Self::Collaborator),
            "admin" => Ok(Self::Owner),
            other => Err(CoreError::Validation(format!(
                "Unknown legacy access level '{other}'"
            ))),
        }
    }

    /// Default permission set for this level.
    pub fn default_permissions(self) -> DemoPermissions {
        match self {
            Self::Owner => DemoPermissions::all(),
            Self::Collaborator => DemoPermissions {
                view_demo: true,
                view_files: true,
                comment: true,
                approve: false,
                download: true,
            },
            Self::Viewer => DemoPermissions {
                view_demo: true,
                ..DemoPermissions::none()
            },
        }
    }
}

impl FromStr for AccessLevel {
    type Err = CoreError;

    /// Parses the canonical names, falling back to the legacy vocabulary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "collaborator" => Ok(Self::Collaborator),
            other => Self::from_legacy(other),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed permission flags of a grant.
///
/// Only `view_demo` is enforced by this service. The rest are advisory and
/// consumed by client UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoPermissions {
    pub view_demo: bool,
    pub view_files: bool,
    pub comment: bool,
    pub approve: bool,
    pub download: bool,
}

impl DemoPermissions {
    pub const fn all() -> Self {
        Self {
            view_demo: true,
            view_files: true,
            comment: true,
            approve: true,
            download: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            view_demo: false,
            view_files: false,
            comment: false,
            approve: false,
            download: false,
        }
    }
}

/// An explicit, admin-issued access grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessGrant {
    pub project_id: DbId,
    pub user_id: DbId,
    pub access_level: AccessLevel,
    pub permissions: DemoPermissions,
    pub granted_by: DbId,
    pub granted_at: Timestamp,
}

/// Upsert payload for a grant. `permissions` overrides the level defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantAccess {
    pub project_id: DbId,
    pub user_id: DbId,
    pub access_level: AccessLevel,
    pub permissions: DemoPermissions,
    pub granted_by: DbId,
}

impl GrantAccess {
    pub fn new(
        project_id: DbId,
        user_id: DbId,
        access_level: AccessLevel,
        permissions: Option<DemoPermissions>,
        granted_by: DbId,
    ) -> Self {
        Self {
            project_id,
            user_id,
            access_level,
            permissions: permissions.unwrap_or_else(|| access_level.default_permissions()),
            granted_by,
        }
    }
}

/// Result of resolving a user's access to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessResolution {
    pub has_access: bool,
    pub access_level: Option<AccessLevel>,
    pub permissions: DemoPermissions,
}

impl AccessResolution {
    pub const fn denied() -> Self {
        Self {
            has_access: false,
            access_level: None,
            permissions: DemoPermissions::none(),
        }
    }

    pub const fn owner() -> Self {
        Self {
            has_access: true,
            access_level: Some(AccessLevel::Owner),
            permissions: DemoPermissions::all(),
        }
    }

    /// Implicit full access used at admin call sites.
    pub const fn admin() -> Self {
        Self::owner()
    }

    /// Whether the demo itself may be viewed. This is the only enforced flag.
    pub fn can_view_demo(&self) -> bool {
        self.has_access && self.permissions.view_demo
    }
}

/// Resolve access for a regular (non-admin) user.
///
/// `client_id` is the project's primary client; `grant` is the explicit grant
/// row for `(project, user_id)`, if any.
pub fn resolve_access(
    user_id: DbId,
    client_id: DbId,
    grant: Option<&AccessGrant>,
) -> AccessResolution {
    if user_id == client_id {
        return AccessResolution::owner();
    }

    match grant {
        Some(grant) if grant.user_id == user_id => AccessResolution {
            has_access: true,
            access_level: Some(grant.access_level),
            permissions: grant.permissions,
        },
        _ => AccessResolution::denied(),
    }
}

// ---------------------------------------------------------------------------
// Store-backed operations
// ---------------------------------------------------------------------------

/// Resolve `user_id`'s access to `project_id` from stored data.
pub async fn resolve_for_user<S: DemoRecordStore>(
    store: &S,
    user_id: DbId,
    project_id: DbId,
) -> Result<AccessResolution, CoreError> {
    let project = store
        .find_project(project_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        })?;

    if user_id == project.client_id {
        return Ok(AccessResolution::owner());
    }

    let grant = store.find_grant(project_id, user_id).await?;
    Ok(resolve_access(user_id, project.client_id, grant.as_ref()))
}

/// Create or replace the grant for `(project, user)`.
///
/// The project's primary client cannot be granted anything; their access is
/// implicit and not managed through grants.
pub async fn grant_access<S: DemoRecordStore>(
    store: &S,
    input: &GrantAccess,
) -> Result<AccessGrant, CoreError> {
    let project = store
        .find_project(input.project_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Project",
            id: input.project_id,
        })?;
    if input.user_id == project.client_id {
        return Err(CoreError::Validation(
            "The project owner's access is implicit and cannot be granted".into(),
        ));
    }

    let grant = store.upsert_grant(input).await?;
    tracing::info!(
        project_id = input.project_id,
        user_id = input.user_id,
        access_level = %input.access_level,
        granted_by = input.granted_by,
        "Project access granted",
    );
    Ok(grant)
}

/// Remove the grant for `(project, user)`.
pub async fn revoke_access<S: DemoRecordStore>(
    store: &S,
    project_id: DbId,
    user_id: DbId,
) -> Result<(), CoreError> {
    let project = store
        .find_project(project_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        })?;
    if user_id == project.client_id {
        return Err(CoreError::Validation(
            "The project owner's access cannot be revoked".into(),
        ));
    }

    if !store.delete_grant(project_id, user_id).await? {
        return Err(CoreError::NotFound {
            entity: "AccessGrant",
            id: user_id,
        });
    }
    tracing::info!(project_id, user_id, "Project access revoked");
    Ok(())
}
