//! Demo project row and its mapping onto the core record.

use showcase_core::demo::{BuildType, DemoProject, DemoSource, DemoStatus, DemoType};
use showcase_core::demo_store::StoreError;
use showcase_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `demo_projects` table, columns as stored.
#[derive(Debug, Clone, FromRow)]
pub struct DemoProjectRow {
    pub id: DbId,
    pub project_id: DbId,
    pub demo_name: String,
    pub demo_slug: String,
    pub demo_type: String,
    pub demo_path: Option<String>,
    pub build_type: Option<String>,
    pub external_url: Option<String>,
    pub external_description: Option<String>,
    pub status: String,
    pub file_size_mb: Option<f64>,
    pub deployed_at: Option<Timestamp>,
    pub last_updated: Timestamp,
    pub created_at: Timestamp,
    pub created_by: DbId,
}

impl TryFrom<DemoProjectRow> for DemoProject {
    type Error = StoreError;

    fn try_from(row: DemoProjectRow) -> Result<Self, Self::Error> {
        let corrupt = |what: String| StoreError::Corrupt(format!("demo_projects {}: {what}", row.id));

        let demo_type: DemoType = row
            .demo_type
            .parse()
            .map_err(|_| corrupt(format!("unknown demo_type '{}'", row.demo_type)))?;
        let status: DemoStatus = row
            .status
            .parse()
            .map_err(|_| corrupt(format!("unknown status '{}'", row.status)))?;

        let source = match demo_type {
            DemoType::Integrated => {
                if row.external_url.is_some() {
                    return Err(corrupt("integrated demo has an external_url".into()));
                }
                let demo_path = row
                    .demo_path
                    .clone()
                    .ok_or_else(|| corrupt("integrated demo has no demo_path".into()))?;
                let build_type: BuildType = row
                    .build_type
                    .as_deref()
                    .ok_or_else(|| corrupt("integrated demo has no build_type".into()))?
                    .parse()
                    .map_err(|_| corrupt("unknown build_type".into()))?;
                DemoSource::Integrated {
                    demo_path,
                    build_type,
                }
            }
            DemoType::External => {
                if row.demo_path.is_some() {
                    return Err(corrupt("external demo has a demo_path".into()));
                }
                let external_url = row
                    .external_url
                    .clone()
                    .ok_or_else(|| corrupt("external demo has no external_url".into()))?;
                DemoSource::External {
                    external_url,
                    external_description: row.external_description.clone(),
                }
            }
        };

        Ok(DemoProject {
            id: row.id,
            project_id: row.project_id,
            demo_name: row.demo_name,
            demo_slug: row.demo_slug,
            source,
            status,
            file_size_mb: row.file_size_mb,
            deployed_at: row.deployed_at,
            last_updated: row.last_updated,
            created_at: row.created_at,
            created_by: row.created_by,
        })
    }
}

/// The mode-specific columns of a [`DemoSource`], for binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceColumns<'a> {
    pub demo_type: &'a str,
    pub demo_path: Option<&'a str>,
    pub build_type: Option<&'a str>,
    pub external_url: Option<&'a str>,
    pub external_description: Option<&'a str>,
}

impl<'a> From<&'a DemoSource> for SourceColumns<'a> {
    fn from(source: &'a DemoSource) -> Self {
        match source {
            DemoSource::Integrated {
                demo_path,
                build_type,
            } => SourceColumns {
                demo_type: DemoType::Integrated.as_str(),
                demo_path: Some(demo_path.as_str()),
                build_type: Some(build_type.as_str()),
                ..Default::default()
            },
            DemoSource::External {
                external_url,
                external_description,
            } => SourceColumns {
                demo_type: DemoType::External.as_str(),
                external_url: Some(external_url.as_str()),
                external_description: external_description.as_deref(),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn integrated_row() -> DemoProjectRow {
        let now = Utc::now();
        DemoProjectRow {
            id: 1,
            project_id: 2,
            demo_name: "Acme".into(),
            demo_slug: "acme".into(),
            demo_type: "integrated".into(),
            demo_path: Some("2/acme".into()),
            build_type: Some("react".into()),
            external_url: None,
            external_description: None,
            status: "ready".into(),
            file_size_mb: Some(1.25),
            deployed_at: Some(now),
            last_updated: now,
            created_at: now,
            created_by: 9,
        }
    }

    #[test]
    fn integrated_row_maps_to_source() {
        let demo = DemoProject::try_from(integrated_row()).unwrap();
        assert_eq!(
            demo.source,
            DemoSource::Integrated {
                demo_path: "2/acme".into(),
                build_type: BuildType::React,
            }
        );
        assert_eq!(demo.status, DemoStatus::Ready);
    }

    #[test]
    fn mixed_mode_row_is_corrupt() {
        let row = DemoProjectRow {
            external_url: Some("https://acme.example".into()),
            ..integrated_row()
        };
        assert_matches!(DemoProject::try_from(row), Err(StoreError::Corrupt(_)));
    }

    #[test]
    fn missing_path_is_corrupt() {
        let row = DemoProjectRow {
            demo_path: None,
            ..integrated_row()
        };
        assert_matches!(DemoProject::try_from(row), Err(StoreError::Corrupt(_)));
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let row = DemoProjectRow {
            status: "live".into(),
            ..integrated_row()
        };
        assert_matches!(DemoProject::try_from(row), Err(StoreError::Corrupt(_)));
    }

    #[test]
    fn source_columns_flatten_external() {
        let source = DemoSource::External {
            external_url: "https://acme.example".into(),
            external_description: Some("Staging".into()),
        };
        let cols = SourceColumns::from(&source);
        assert_eq!(cols.demo_type, "external");
        assert_eq!(cols.external_url, Some("https://acme.example"));
        assert_eq!(cols.demo_path, None);
        assert_eq!(cols.build_type, None);
    }
}
