//! Demo project types, lifecycle state machine, and input validation.
//!
//! A demo is either *integrated* (files staged under the demo root and served
//! by this service) or *external* (a bare link to third-party hosting). The
//! mode is fixed at creation; [`DemoSource`] carries the mode-specific fields
//! so a record can never hold both a staged path and an external URL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Maximum length of a demo display name.
pub const MAX_DEMO_NAME_LEN: usize = 200;

/// URL schemes accepted for external demos.
const EXTERNAL_URL_SCHEMES: &[&str] = &["http", "https"];

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Hosting mode of a demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoType {
    Integrated,
    External,
}

impl DemoType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integrated => "integrated",
            Self::External => "external",
        }
    }
}

impl FromStr for DemoType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integrated" => Ok(Self::Integrated),
            "external" => Ok(Self::External),
            other => Err(CoreError::Validation(format!(
                "Unknown demo type '{other}'. Must be one of: integrated, external"
            ))),
        }
    }
}

impl fmt::Display for DemoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of build output an integrated demo is staged from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Static,
    Html,
    React,
    Nextjs,
}

impl BuildType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Html => "html",
            Self::React => "react",
            Self::Nextjs => "nextjs",
        }
    }
}

impl FromStr for BuildType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Self::Static),
            "html" => Ok(Self::Html),
            "react" => Ok(Self::React),
            "nextjs" => Ok(Self::Nextjs),
            other => Err(CoreError::Validation(format!(
                "Unknown build type '{other}'. Must be one of: static, html, react, nextjs"
            ))),
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Demo lifecycle status.
///
/// `Preparing` is reserved for a future upload-queue stage; stored records may
/// carry it, and it can move to `Building`, but no deployment flow sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoStatus {
    Preparing,
    Building,
    Ready,
    Error,
    Archived,
}

/// Events that drive [`DemoStatus`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoEvent {
    /// A (re)deployment begins staging files.
    StagingStarted,
    /// Files were staged and sized.
    StagingSucceeded,
    /// Staging raised an error.
    StagingFailed,
    /// Admin disabled the demo.
    Disabled,
    /// An external link was (re)registered. External demos have no build phase.
    Relinked,
}

impl DemoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Building => "building",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Archived => "archived",
        }
    }

    /// Apply `event`, returning the next status.
    ///
    /// ```text
    /// preparing | ready | error | archived --StagingStarted--> building
    /// building  --StagingSucceeded--> ready
    /// building  --StagingFailed-->    error
    /// ready     --Disabled-->         archived
    /// ready | error | archived --Relinked--> ready
    /// ```
    ///
    /// There is no direct `archived -> ready` edge for integrated demos; they
    /// return to `ready` only through a new staging run.
    pub fn apply(self, event: DemoEvent) -> Result<DemoStatus, CoreError> {
        use DemoEvent::*;
        use DemoStatus::*;

        match (self, event) {
            (Preparing | Ready | Error | Archived, StagingStarted) => Ok(Building),
            (Building, StagingSucceeded) => Ok(Ready),
            (Building, StagingFailed) => Ok(Error),
            (Ready, Disabled) => Ok(Archived),
            (Ready | Error | Archived, Relinked) => Ok(Ready),
            (Building, StagingStarted) => Err(CoreError::Conflict(
                "A deployment is already in progress for this demo".into(),
            )),
            (from, event) => Err(CoreError::Conflict(format!(
                "Cannot apply {event:?} to a demo in status '{from}'"
            ))),
        }
    }
}

impl FromStr for DemoStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preparing" => Ok(Self::Preparing),
            "building" => Ok(Self::Building),
            "ready" => Ok(Self::Ready),
            "error" => Ok(Self::Error),
            "archived" => Ok(Self::Archived),
            other => Err(CoreError::Validation(format!("Unknown demo status '{other}'"))),
        }
    }
}

impl fmt::Display for DemoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Mode-specific fields of a demo.
///
/// Serialized flat into the owning record with a `demo_type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "demo_type", rename_all = "lowercase")]
pub enum DemoSource {
    Integrated {
        /// Storage path relative to the demo root: `{project_id}/{slug}`.
        demo_path: String,
        build_type: BuildType,
    },
    External {
        external_url: String,
        external_description: Option<String>,
    },
}

impl DemoSource {
    pub fn demo_type(&self) -> DemoType {
        match self {
            Self::Integrated { .. } => DemoType::Integrated,
            Self::External { .. } => DemoType::External,
        }
    }
}

/// A persisted demo project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoProject {
    pub id: DbId,
    pub project_id: DbId,
    pub demo_name: String,
    pub demo_slug: String,
    #[serde(flatten)]
    pub source: DemoSource,
    pub status: DemoStatus,
    pub file_size_mb: Option<f64>,
    pub deployed_at: Option<Timestamp>,
    pub last_updated: Timestamp,
    pub created_at: Timestamp,
    pub created_by: DbId,
}

impl DemoProject {
    pub fn demo_type(&self) -> DemoType {
        self.source.demo_type()
    }

    /// Staged path relative to the demo root, for integrated demos.
    pub fn demo_path(&self) -> Option<&str> {
        match &self.source {
            DemoSource::Integrated { demo_path, .. } => Some(demo_path),
            DemoSource::External { .. } => None,
        }
    }

    pub fn external_url(&self) -> Option<&str> {
        match &self.source {
            DemoSource::External { external_url, .. } => Some(external_url),
            DemoSource::Integrated { .. } => None,
        }
    }
}

/// Insert payload for a new demo record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDemoProject {
    pub project_id: DbId,
    pub demo_name: String,
    pub demo_slug: String,
    pub source: DemoSource,
    pub status: DemoStatus,
    pub deployed_at: Option<Timestamp>,
    pub created_by: DbId,
}

/// Admin edit of an existing demo. Mode and slug are not editable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateDemo {
    pub demo_name: Option<String>,
    pub external_url: Option<String>,
    pub external_description: Option<String>,
}

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Storage path of an integrated demo, relative to the demo root.
pub fn demo_storage_path(project_id: DbId, slug: &str) -> String {
    format!("{project_id}/{slug}")
}

/// Public viewer URL of a demo.
pub fn demo_public_url(public_base_url: &str, slug: &str) -> String {
    format!("{}/demo/{slug}", public_base_url.trim_end_matches('/'))
}

/// Embed URL the viewer page points its iframe at.
pub fn demo_embed_url(project_id: DbId, slug: &str) -> String {
    format!("/api/demos/{project_id}/{slug}/index.html")
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a demo display name, returning it trimmed.
pub fn validate_demo_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Demo name must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_DEMO_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Demo name must be at most {MAX_DEMO_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate that `raw` is an absolute `http`/`https` URL with a host.
///
/// Returns the normalized URL string.
pub fn validate_external_url(raw: &str) -> Result<String, CoreError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|_| CoreError::Validation(format!("invalid URL: '{raw}'")))?;

    if !EXTERNAL_URL_SCHEMES.contains(&parsed.scheme()) {
        return Err(CoreError::Validation(format!(
            "invalid URL: scheme '{}' is not allowed",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::Validation(format!("invalid URL: '{raw}' has no host")));
    }

    Ok(parsed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
