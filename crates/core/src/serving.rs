//! Path-safe resolution and opening of staged demo files.
//!
//! [`resolve_demo_file`] is purely lexical: a request is rejected before the
//! filesystem is touched if any segment could step outside the project's demo
//! directory. [`open_demo_file`] then re-checks containment on the
//! canonicalized path so symlinks inside a demo cannot escape either.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::types::DbId;

/// `Cache-Control` value for served demo files. Redeployments restage the
/// same paths rarely enough that an hour of public caching is acceptable.
pub const DEMO_CACHE_CONTROL: &str = "public, max-age=3600";

/// File served when the request resolves to a directory.
pub const DIRECTORY_INDEX: &str = "index.html";

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The request would resolve outside the project's demo directory.
    #[error("Forbidden demo path: {0}")]
    Forbidden(String),

    #[error("Demo file not found: {0}")]
    NotFound(String),

    #[error("I/O error serving demo file: {0}")]
    Io(#[from] io::Error),
}

/// An opened demo file ready to stream.
#[derive(Debug)]
pub struct ServedFile {
    pub file: tokio::fs::File,
    pub len: u64,
    pub content_type: String,
    pub path: PathBuf,
}

/// Absolute directory holding every demo of `project_id`.
pub fn project_demo_dir(demo_root: &Path, project_id: DbId) -> Result<PathBuf, ServeError> {
    Ok(std::path::absolute(demo_root)?.join(project_id.to_string()))
}

/// Resolve `segments` under the project's demo directory without I/O.
///
/// Rejects parent-directory components, absolute or rooted segments,
/// backslashes, NUL bytes, and anything that resolves to the project
/// directory itself.
pub fn resolve_demo_file<S: AsRef<str>>(
    demo_root: &Path,
    project_id: DbId,
    segments: &[S],
) -> Result<PathBuf, ServeError> {
    let project_dir = project_demo_dir(demo_root, project_id)?;
    let mut target = project_dir.clone();

    for segment in segments {
        let segment = segment.as_ref();
        if segment.contains('\\') || segment.contains('\0') {
            return Err(ServeError::Forbidden(segment.to_string()));
        }
        for component in Path::new(segment).components() {
            match component {
                Component::Normal(part) => target.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(ServeError::Forbidden(segment.to_string()));
                }
            }
        }
    }

    if target == project_dir || !target.starts_with(&project_dir) {
        return Err(ServeError::Forbidden(
            segments
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join("/"),
        ));
    }

    Ok(target)
}

/// Content type for a file, defaulting to `application/octet-stream`.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Resolve and open a demo file for streaming.
pub async fn open_demo_file<S: AsRef<str>>(
    demo_root: &Path,
    project_id: DbId,
    segments: &[S],
) -> Result<ServedFile, ServeError> {
    let mut target = resolve_demo_file(demo_root, project_id, segments)?;
    let display = target.display().to_string();

    let mut meta = match tokio::fs::metadata(&target).await {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ServeError::NotFound(display));
        }
        Err(err) => return Err(err.into()),
    };
    if meta.is_dir() {
        target.push(DIRECTORY_INDEX);
        meta = match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(ServeError::NotFound(display)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ServeError::NotFound(display));
            }
            Err(err) => return Err(err.into()),
        };
    }

    let project_dir = tokio::fs::canonicalize(project_demo_dir(demo_root, project_id)?).await?;
    let canonical = tokio::fs::canonicalize(&target).await?;
    if !canonical.starts_with(&project_dir) {
        tracing::warn!(
            project_id,
            path = %target.display(),
            "Demo file resolves outside its project directory"
        );
        return Err(ServeError::Forbidden(display));
    }

    let file = tokio::fs::File::open(&canonical).await?;
    Ok(ServedFile {
        file,
        len: meta.len(),
        content_type: content_type_for(&canonical),
        path: canonical,
    })
}
