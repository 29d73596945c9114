//! Filesystem staging of client build output into the demo hosting area.
//!
//! Staging walks a source tree and copies an allow-listed subset of it:
//!
//! - directories on the skip-list (dependency, VCS and cache folders) and any
//!   dot-directory are never entered;
//! - only web-asset extensions are copied;
//! - files at or above the size ceiling are skipped;
//! - symbolic links are never followed.
//!
//! Copying is best-effort per file. A failure on one file is logged and
//! recorded as a warning in the [`CopyReport`]; only failures that prevent
//! staging altogether (missing source, unwritable destination) are errors.
//!
//! Everything here is blocking `std::fs` I/O. Async callers run it on the
//! blocking pool.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::demo::BuildType;
use crate::error::CoreError;

/// Default per-file size ceiling (100 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 100 * 1024 * 1024;

/// Directory names never copied, at any depth.
pub const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    ".cache",
    ".turbo",
    ".parcel-cache",
    ".vercel",
    "cache",
    "coverage",
    "__pycache__",
];

/// File extensions (lowercase, without the dot) eligible for copying.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    // documents
    "html", "htm", "css", "js", "mjs", "json", "txt", "xml", "pdf", "webmanifest",
    // images
    "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
];

/// Subpath Next.js build output is staged under.
pub const NEXTJS_OUTPUT_SUBDIR: &str = "_next";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ---------------------------------------------------------------------------
// Errors and reports
// ---------------------------------------------------------------------------

/// Failures that abort a staging run.
#[derive(Debug)]
pub enum StagingError {
    SourceMissing(PathBuf),

    NotADirectory(PathBuf),

    Io {
        path: PathBuf,
        source: io::Error,
    },

    Overlap { source: PathBuf, root: PathBuf },

    Task(String),
}

// Display/Error are implemented by hand: thiserror always treats a field
// named `source` as the error source, which `Overlap`'s `PathBuf` is not.
impl std::fmt::Display for StagingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceMissing(path) => {
                write!(f, "Source directory not found: {}", path.display())
            }
            Self::NotADirectory(path) => {
                write!(f, "Source path is not a directory: {}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "I/O error at {}: {}", path.display(), source)
            }
            Self::Overlap { source, root } => write!(
                f,
                "Source {} overlaps the demo storage root {}",
                source.display(),
                root.display()
            ),
            Self::Task(msg) => write!(f, "Staging task failed: {msg}"),
        }
    }
}

impl std::error::Error for StagingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<StagingError> for CoreError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::Overlap { .. } => CoreError::Validation(err.to_string()),
            _ => CoreError::Internal(err.to_string()),
        }
    }
}

impl StagingError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Why a source entry was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Directory on the skip-list or a dot-directory.
    Directory,
    /// Dotfile.
    Hidden,
    /// Extension not on the allow-list.
    Extension,
    /// File at or above the size ceiling.
    TooLarge,
    /// Symbolic link.
    Symlink,
}

/// A source entry that was deliberately not copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Outcome of a copy or staging run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub files_copied: usize,
    pub bytes_copied: u64,
    pub skipped: Vec<SkippedEntry>,
    /// Per-file failures that did not abort the run.
    pub warnings: Vec<String>,
    /// `true` when `index.html` had to be synthesized.
    pub placeholder_index: bool,
}

impl CopyReport {
    fn merge(&mut self, other: CopyReport) {
        self.files_copied += other.files_copied;
        self.bytes_copied += other.bytes_copied;
        self.skipped.extend(other.skipped);
        self.warnings.extend(other.warnings);
        self.placeholder_index |= other.placeholder_index;
    }
}

/// Tunables for a staging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPolicy {
    /// Files of this size or larger are skipped.
    pub max_file_bytes: u64,
}

impl Default for StagingPolicy {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Returns `true` if a directory with this name must not be entered.
pub fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Returns `true` if the file's extension is on the allow-list.
pub fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

fn entry_name(entry: &DirEntry) -> String {
    entry.file_name().to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Copying
// ---------------------------------------------------------------------------

/// Copy the allow-listed contents of `src` into `dest`, creating `dest`.
///
/// The root of `src` itself is never filtered, so a `.next` directory can be
/// passed as the source.
pub fn copy_tree(src: &Path, dest: &Path, policy: &StagingPolicy) -> Result<CopyReport, StagingError> {
    if !src.exists() {
        return Err(StagingError::SourceMissing(src.to_path_buf()));
    }
    if !src.is_dir() {
        return Err(StagingError::NotADirectory(src.to_path_buf()));
    }
    fs::create_dir_all(dest).map_err(|e| StagingError::io(dest, e))?;

    let mut report = CopyReport::default();

    let mut pruned = Vec::new();
    let mut walker = WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let skip = entry.depth() > 0
                && entry.file_type().is_dir()
                && is_skipped_dir(&entry_name(entry));
            if skip {
                pruned.push(entry.path().to_path_buf());
            }
            !skip
        });

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                tracing::warn!(path = %path.display(), error = %err, "Failed to read source entry");
                report
                    .warnings
                    .push(format!("Failed to read {}: {err}", path.display()));
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let relative = match entry.path().strip_prefix(src) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            report.warnings.push(format!(
                "Skipped symbolic link {}",
                relative.display()
            ));
            report.skipped.push(SkippedEntry {
                path: relative,
                reason: SkipReason::Symlink,
            });
            continue;
        }

        if file_type.is_dir() {
            let target = dest.join(&relative);
            if let Err(err) = fs::create_dir_all(&target) {
                tracing::warn!(path = %target.display(), error = %err, "Failed to create directory");
                report
                    .warnings
                    .push(format!("Failed to create {}: {err}", relative.display()));
            }
            continue;
        }

        let name = entry_name(&entry);
        if name.starts_with('.') {
            report.skipped.push(SkippedEntry {
                path: relative,
                reason: SkipReason::Hidden,
            });
            continue;
        }
        if !has_allowed_extension(entry.path()) {
            report.skipped.push(SkippedEntry {
                path: relative,
                reason: SkipReason::Extension,
            });
            continue;
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(err) => {
                tracing::warn!(path = %relative.display(), error = %err, "Failed to stat file");
                report
                    .warnings
                    .push(format!("Failed to stat {}: {err}", relative.display()));
                continue;
            }
        };
        if size >= policy.max_file_bytes {
            tracing::debug!(path = %relative.display(), size, "Skipping oversized file");
            report.skipped.push(SkippedEntry {
                path: relative,
                reason: SkipReason::TooLarge,
            });
            continue;
        }

        let target = dest.join(&relative);
        let copied = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::copy(entry.path(), &target));
        match copied {
            Ok(bytes) => {
                report.files_copied += 1;
                report.bytes_copied += bytes;
            }
            Err(err) => {
                tracing::warn!(path = %relative.display(), error = %err, "Failed to copy file");
                report
                    .warnings
                    .push(format!("Failed to copy {}: {err}", relative.display()));
            }
        }
    }

    drop(walker);
    report.skipped.extend(pruned.into_iter().filter_map(|path| {
        path.strip_prefix(src).ok().map(|rel| SkippedEntry {
            path: rel.to_path_buf(),
            reason: SkipReason::Directory,
        })
    }));

    Ok(report)
}

/// Stage a build of `build_type` from `source_root` into `dest`.
///
/// - `nextjs`: `.next` is copied under `_next/`, `public/` (if present) to the root.
/// - `react`: the `build/` directory is copied to the root.
/// - `static` / `html`: `source_root` is copied verbatim.
///
/// `dest` always ends up with an `index.html`; a placeholder naming the build
/// type is written if the build did not provide one.
pub fn stage_build(
    build_type: BuildType,
    source_root: &Path,
    dest: &Path,
    policy: &StagingPolicy,
) -> Result<CopyReport, StagingError> {
    if !source_root.is_dir() {
        return Err(StagingError::SourceMissing(source_root.to_path_buf()));
    }

    let mut report = match build_type {
        BuildType::Nextjs => {
            let mut report =
                copy_tree(&source_root.join(".next"), &dest.join(NEXTJS_OUTPUT_SUBDIR), policy)?;
            let public = source_root.join("public");
            if public.is_dir() {
                report.merge(copy_tree(&public, dest, policy)?);
            }
            report
        }
        BuildType::React => copy_tree(&source_root.join("build"), dest, policy)?,
        BuildType::Static | BuildType::Html => copy_tree(source_root, dest, policy)?,
    };

    report.placeholder_index = ensure_index_html(dest, build_type)?;
    Ok(report)
}

/// Write a placeholder `index.html` into `dest` unless one exists.
///
/// Returns `true` if the placeholder was written.
pub fn ensure_index_html(dest: &Path, build_type: BuildType) -> Result<bool, StagingError> {
    let index = dest.join("index.html");
    if index.is_file() {
        return Ok(false);
    }
    fs::create_dir_all(dest).map_err(|e| StagingError::io(dest, e))?;
    fs::write(&index, placeholder_index_html(build_type)).map_err(|e| StagingError::io(&index, e))?;
    Ok(true)
}

fn placeholder_index_html(build_type: BuildType) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n  \
         <title>Demo</title>\n</head>\n<body>\n  <h1>Demo</h1>\n  \
         <p>This {build_type} demo does not include an index.html entry point.</p>\n\
         </body>\n</html>\n"
    )
}

// ---------------------------------------------------------------------------
// Sizing and removal
// ---------------------------------------------------------------------------

/// Total size in bytes of all regular files under `root`.
pub fn directory_size_bytes(root: &Path) -> Result<u64, StagingError> {
    let mut total = 0u64;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            StagingError::Io {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_file() {
            let meta = entry
                .metadata()
                .map_err(|e| StagingError::io(entry.path(), e.into()))?;
            total += meta.len();
        }
    }
    Ok(total)
}

/// Convert bytes to megabytes rounded to two decimals.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Reject a source tree that contains `demo_root` or lives inside it.
///
/// Either overlap would make staging copy the hosting area into itself. A
/// missing source passes; staging reports it.
pub fn ensure_disjoint(source: &Path, demo_root: &Path) -> Result<(), StagingError> {
    let source = match fs::canonicalize(source) {
        Ok(path) => path,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(StagingError::io(source, err)),
    };
    fs::create_dir_all(demo_root).map_err(|e| StagingError::io(demo_root, e))?;
    let root = fs::canonicalize(demo_root).map_err(|e| StagingError::io(demo_root, e))?;

    if root.starts_with(&source) || source.starts_with(&root) {
        return Err(StagingError::Overlap { source, root });
    }
    Ok(())
}

/// Remove a staged demo directory. Missing directories are not an error.
pub fn remove_demo_dir(dir: &Path) -> Result<(), StagingError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StagingError::io(dir, err)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs::File;

    use assert_matches::assert_matches;

    use super::*;

    fn write(root: &Path, rel: &str, bytes: usize) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, vec![b'a'; bytes]).expect("write");
    }

    fn sparse(root: &Path, rel: &str, len: u64) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        File::create(path).expect("create").set_len(len).expect("set_len");
    }

    #[test]
    fn copies_web_assets_and_skips_the_rest() {
        let src = tempfile::tempdir().expect("src");
        let dest = tempfile::tempdir().expect("dest");
        write(src.path(), "index.html", 10);
        write(src.path(), "style.css", 10);
        write(src.path(), "setup.exe", 10);
        write(src.path(), "node_modules/lib/index.js", 10);
        write(src.path(), ".git/HEAD.txt", 10);
        write(src.path(), ".env.json", 10);
        write(src.path(), "assets/logo.PNG", 10);

        let report = copy_tree(src.path(), dest.path(), &StagingPolicy::default()).expect("copy");

        assert!(dest.path().join("index.html").is_file());
        assert!(dest.path().join("style.css").is_file());
        assert!(dest.path().join("assets/logo.PNG").is_file());
        assert!(!dest.path().join("setup.exe").exists());
        assert!(!dest.path().join("node_modules").exists());
        assert!(!dest.path().join(".git").exists());
        assert!(!dest.path().join(".env.json").exists());
        assert_eq!(report.files_copied, 3);
        assert_eq!(report.bytes_copied, 30);
        assert!(report.warnings.is_empty());
        assert!(report
            .skipped
            .iter()
            .any(|s| s.path == Path::new("setup.exe") && s.reason == SkipReason::Extension));
        assert!(report
            .skipped
            .iter()
            .any(|s| s.path == Path::new("node_modules") && s.reason == SkipReason::Directory));
    }

    #[test]
    fn size_ceiling_is_exclusive() {
        let src = tempfile::tempdir().expect("src");
        let dest = tempfile::tempdir().expect("dest");
        sparse(src.path(), "under.pdf", DEFAULT_MAX_FILE_BYTES - 1);
        sparse(src.path(), "at.pdf", DEFAULT_MAX_FILE_BYTES);
        sparse(src.path(), "over.pdf", DEFAULT_MAX_FILE_BYTES + 1);

        let policy = StagingPolicy::default();
        let report = copy_tree(src.path(), dest.path(), &policy).expect("copy");

        assert!(dest.path().join("under.pdf").is_file());
        assert!(!dest.path().join("at.pdf").exists());
        assert!(!dest.path().join("over.pdf").exists());
        assert_eq!(
            report
                .skipped
                .iter()
                .filter(|s| s.reason == SkipReason::TooLarge)
                .count(),
            2
        );
    }

    #[test]
    fn single_file_failure_does_not_abort() {
        let src = tempfile::tempdir().expect("src");
        let dest = tempfile::tempdir().expect("dest");
        write(src.path(), "index.html", 5);
        write(src.path(), "app.js", 5);
        // A directory where the file should land makes that one copy fail.
        fs::create_dir_all(dest.path().join("app.js")).expect("blocker");

        let report = copy_tree(src.path(), dest.path(), &StagingPolicy::default()).expect("copy");

        assert_eq!(report.files_copied, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("app.js"));
        assert!(dest.path().join("index.html").is_file());
    }

    #[test]
    fn source_containing_demo_root_is_rejected() {
        let build = tempfile::tempdir().expect("build");
        let root = build.path().join("demos");

        assert_matches!(
            ensure_disjoint(build.path(), &root),
            Err(StagingError::Overlap { .. })
        );
        assert_matches!(
            ensure_disjoint(&root.join("1/acme"), &root),
            Ok(())
        );
        fs::create_dir_all(root.join("1/acme")).expect("staged demo");
        assert_matches!(
            ensure_disjoint(&root.join("1/acme"), &root),
            Err(StagingError::Overlap { .. })
        );
    }

    #[test]
    fn sibling_source_is_accepted() {
        let parent = tempfile::tempdir().expect("parent");
        fs::create_dir_all(parent.path().join("build")).expect("build");

        assert_matches!(
            ensure_disjoint(&parent.path().join("build"), &parent.path().join("demos")),
            Ok(())
        );
    }

    #[test]
    fn overlap_is_a_validation_error() {
        let err = CoreError::from(StagingError::Overlap {
            source: PathBuf::from("/srv"),
            root: PathBuf::from("/srv/demos"),
        });
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("overlaps"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let src = tempfile::tempdir().expect("src");
        let dest = tempfile::tempdir().expect("dest");
        write(src.path(), "index.html", 5);
        std::os::unix::fs::symlink("/etc/hostname", src.path().join("leak.txt")).expect("symlink");

        let report = copy_tree(src.path(), dest.path(), &StagingPolicy::default()).expect("copy");

        assert!(!dest.path().join("leak.txt").exists());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::Symlink);
    }

    #[test]
    fn missing_source_is_an_error() {
        let dest = tempfile::tempdir().expect("dest");
        let missing = dest.path().join("nope");
        assert_matches!(
            copy_tree(&missing, dest.path(), &StagingPolicy::default()),
            Err(StagingError::SourceMissing(_))
        );
    }

    #[test]
    fn nextjs_layout() {
        let src = tempfile::tempdir().expect("src");
        let dest = tempfile::tempdir().expect("dest");
        write(src.path(), ".next/static/chunks/main.js", 8);
        write(src.path(), ".next/cache/webpack/big.json", 8);
        write(src.path(), "public/favicon.ico", 8);
        write(src.path(), "public/index.html", 8);
        write(src.path(), "src/page.tsx", 8);

        let report =
            stage_build(BuildType::Nextjs, src.path(), dest.path(), &StagingPolicy::default())
                .expect("stage");

        assert!(dest.path().join("_next/static/chunks/main.js").is_file());
        assert!(!dest.path().join("_next/cache").exists());
        assert!(dest.path().join("favicon.ico").is_file());
        assert!(dest.path().join("index.html").is_file());
        assert!(!dest.path().join("src").exists());
        assert!(!report.placeholder_index);
    }

    #[test]
    fn react_uses_build_dir() {
        let src = tempfile::tempdir().expect("src");
        let dest = tempfile::tempdir().expect("dest");
        write(src.path(), "build/index.html", 8);
        write(src.path(), "build/static/js/app.js", 8);
        write(src.path(), "package.json", 8);

        stage_build(BuildType::React, src.path(), dest.path(), &StagingPolicy::default())
            .expect("stage");

        assert!(dest.path().join("index.html").is_file());
        assert!(dest.path().join("static/js/app.js").is_file());
        assert!(!dest.path().join("package.json").exists());
    }

    #[test]
    fn react_without_build_dir_fails() {
        let src = tempfile::tempdir().expect("src");
        let dest = tempfile::tempdir().expect("dest");
        write(src.path(), "package.json", 8);
        assert_matches!(
            stage_build(BuildType::React, src.path(), dest.path(), &StagingPolicy::default()),
            Err(StagingError::SourceMissing(_))
        );
    }

    #[test]
    fn placeholder_index_names_build_type() {
        let src = tempfile::tempdir().expect("src");
        let dest = tempfile::tempdir().expect("dest");
        write(src.path(), "about.html", 8);

        let report =
            stage_build(BuildType::Static, src.path(), dest.path(), &StagingPolicy::default())
                .expect("stage");

        assert!(report.placeholder_index);
        let index = fs::read_to_string(dest.path().join("index.html")).expect("index");
        assert!(index.contains("static demo"));
    }

    #[test]
    fn sizing() {
        let dir = tempfile::tempdir().expect("dir");
        write(dir.path(), "a.html", 2048);
        write(dir.path(), "nested/b.js", 3072);
        assert_eq!(directory_size_bytes(dir.path()).expect("size"), 5120);
        assert_eq!(bytes_to_mb(5120), 0.0);
        assert_eq!(bytes_to_mb(1024 * 1024 * 3 / 2), 1.5);
        assert_eq!(bytes_to_mb(1_234_567), 1.18);
    }

    #[test]
    fn remove_missing_dir_is_ok() {
        let dir = tempfile::tempdir().expect("dir");
        let target = dir.path().join("gone");
        assert!(remove_demo_dir(&target).is_ok());
        write(&target, "x.html", 1);
        remove_demo_dir(&target).expect("remove");
        assert!(!target.exists());
    }
}
