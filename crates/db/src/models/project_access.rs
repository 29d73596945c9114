//! Project access grant model.

use showcase_core::access::{AccessGrant, AccessLevel, DemoPermissions};
use showcase_core::demo_store::StoreError;
use showcase_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `project_access` table.
///
/// `access_level` may hold a legacy name; it is normalized on conversion.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectAccessRow {
    pub project_id: DbId,
    pub user_id: DbId,
    pub access_level: String,
    pub view_demo: bool,
    pub view_files: bool,
    pub comment: bool,
    pub approve: bool,
    pub download: bool,
    pub granted_by: DbId,
    pub granted_at: Timestamp,
}

impl TryFrom<ProjectAccessRow> for AccessGrant {
    type Error = StoreError;

    fn try_from(row: ProjectAccessRow) -> Result<Self, Self::Error> {
        let access_level: AccessLevel = row.access_level.parse().map_err(|_| {
            StoreError::Corrupt(format!(
                "project_access ({}, {}) has unknown access level '{}'",
                row.project_id, row.user_id, row.access_level
            ))
        })?;
        Ok(AccessGrant {
            project_id: row.project_id,
            user_id: row.user_id,
            access_level,
            permissions: DemoPermissions {
                view_demo: row.view_demo,
                view_files: row.view_files,
                comment: row.comment,
                approve: row.approve,
                download: row.download,
            },
            granted_by: row.granted_by,
            granted_at: row.granted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn row(level: &str) -> ProjectAccessRow {
        ProjectAccessRow {
            project_id: 1,
            user_id: 2,
            access_level: level.into(),
            view_demo: true,
            view_files: false,
            comment: false,
            approve: false,
            download: false,
            granted_by: 3,
            granted_at: Utc::now(),
        }
    }

    #[test]
    fn legacy_levels_are_normalized() {
        let grant = AccessGrant::try_from(row("editor")).unwrap();
        assert_eq!(grant.access_level, AccessLevel::Collaborator);
        let grant = AccessGrant::try_from(row("admin")).unwrap();
        assert_eq!(grant.access_level, AccessLevel::Owner);
    }

    #[test]
    fn stored_permissions_are_kept_verbatim() {
        let grant = AccessGrant::try_from(row("owner")).unwrap();
        assert_eq!(
            grant.permissions,
            DemoPermissions {
                view_demo: true,
                ..DemoPermissions::none()
            }
        );
    }

    #[test]
    fn unknown_level_is_corrupt() {
        assert_matches!(AccessGrant::try_from(row("superuser")), Err(StoreError::Corrupt(_)));
    }
}
