//! URL-safe demo slugs.
//!
//! [`slugify`] is pure and idempotent. [`fallback_slug`] and
//! [`disambiguated_slug`] produce the deterministic alternatives the deployment
//! flow tries when the base slug is empty or already owned by another project.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::DbId;

/// Characters outside `[a-z0-9\s-]` after lowercasing.
static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static HYPHEN_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid regex"));

/// Turn a display name into a lowercase ASCII slug.
///
/// Strips everything outside `[a-z0-9\s-]`, turns whitespace runs into a
/// single hyphen, collapses hyphen runs and trims edge hyphens. May return an
/// empty string for all-symbol input; callers fall back to [`fallback_slug`].
///
/// ```
/// use showcase_core::slug::slugify;
///
/// assert_eq!(slugify("Acme Site"), "acme-site");
/// assert_eq!(slugify("  Café -- Menu!! "), "caf-menu");
/// assert_eq!(slugify("!!!"), "");
/// ```
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = DISALLOWED_RE.replace_all(&lowered, "");
    let hyphenated = WHITESPACE_RE.replace_all(stripped.trim(), "-");
    let collapsed = HYPHEN_RUN_RE.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

/// Slug used when a name yields no slug characters at all.
pub fn fallback_slug(project_id: DbId) -> String {
    format!("demo-{project_id}")
}

/// The `attempt`-th alternative to `base` for `project_id`.
///
/// Attempt 0 is the base itself, attempt 1 appends the project id, later
/// attempts append a sequence number as well. The sequence is the same on
/// every call, so a project redeploying under a taken name lands on the same
/// slug it was given the first time.
pub fn disambiguated_slug(base: &str, project_id: DbId, attempt: u32) -> String {
    match attempt {
        0 => base.to_string(),
        1 => format!("{base}-{project_id}"),
        n => format!("{base}-{project_id}-{n}"),
    }
}

/// Returns `true` if `slug` is non-empty and in canonical slug form.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slugify(slug) == slug
}
