//! Release notes rendering.
//!
//! Notes are rendered with Handlebars. Templates receive exactly
//! [`ReleaseNotesData`] plus one helper, `groupByScope`, which turns a list
//! of commits into `[{ scope, commits }]` groups for display.
//!
//! Each call to [`render_notes`] builds its own registry, so helper
//! registration never leaks between renders.

use std::collections::BTreeMap;

use camino::Utf8Path;
use handlebars::{Handlebars, handlebars_helper};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::commits::{CategorizedCommits, Commit};

/// Errors from the release notes renderer.
#[derive(Error, Debug)]
pub enum NotesError {
    /// The template failed to compile or render.
    #[error("failed to render release notes: {0}")]
    Render(#[from] handlebars::RenderError),

    /// Failed to read a custom template file.
    #[error("failed to read template at {path}: {source}")]
    ReadTemplate {
        /// Path to the template file.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Result alias for notes operations.
pub type NotesResult<T> = Result<T, NotesError>;

/// Built-in template used when the caller supplies none.
const BUILTIN_TEMPLATE: &str = include_str!("../templates/release-notes.hbs");

/// Name under which the scope-grouping helper is exposed to templates.
pub const GROUP_BY_SCOPE: &str = "groupByScope";

/// Group name for commits without a scope. Always sorted last.
pub const GENERAL_SCOPE: &str = "General";

/// The data handed to a release notes template.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseNotesData {
    /// The version being released, without tag prefix.
    pub version: String,
    /// Categorized commits, flattened to `features` / `fixes` / `breaking`.
    #[serde(flatten)]
    pub commits: CategorizedCommits,
}

/// Commits sharing one display scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeGroup {
    /// Display name of the scope, e.g. `Release Notes` for `release-notes`.
    pub scope: String,
    /// Commits in their original order.
    pub commits: Vec<Commit>,
}

/// Render release notes.
///
/// A blank `template` selects the built-in one.
///
/// # Errors
///
/// Returns [`NotesError::Render`] if the template does not compile or a
/// helper fails. No partial output is returned.
#[instrument(skip_all, fields(version = %data.version, custom = !template.trim().is_empty()))]
pub fn render_notes(template: &str, data: &ReleaseNotesData) -> NotesResult<String> {
    let template = if template.trim().is_empty() {
        debug!("using built-in release notes template");
        BUILTIN_TEMPLATE
    } else {
        template
    };

    let notes = registry().render_template(template, data)?;
    debug!(bytes = notes.len(), "rendered release notes");
    Ok(notes)
}

/// Read a template from disk.
///
/// # Errors
///
/// Returns [`NotesError::ReadTemplate`] if the file cannot be read.
pub fn load_template(path: &Utf8Path) -> NotesResult<String> {
    std::fs::read_to_string(path).map_err(|source| NotesError::ReadTemplate {
        path: path.to_string(),
        source,
    })
}

/// Group commits by display scope.
///
/// Unscoped commits land in [`GENERAL_SCOPE`]. Groups are sorted by display
/// name with `General` forced last; commit order inside a group is kept.
pub fn group_by_scope(commits: &[Commit]) -> Vec<ScopeGroup> {
    group_with(commits, |c| c.scope.as_deref())
        .into_iter()
        .map(|(scope, commits)| ScopeGroup { scope, commits })
        .collect()
}

/// Title-case a raw scope for display: `release-notes` becomes `Release Notes`.
pub fn display_scope(scope: Option<&str>) -> String {
    let words: Vec<String> = scope
        .unwrap_or_default()
        .split(['-', '_'])
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();

    if words.is_empty() {
        GENERAL_SCOPE.to_string()
    } else {
        words.join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn group_with<T: Clone>(
    items: &[T],
    scope_of: impl Fn(&T) -> Option<&str>,
) -> Vec<(String, Vec<T>)> {
    let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        groups
            .entry(display_scope(scope_of(item)))
            .or_default()
            .push(item.clone());
    }

    let general = groups.remove(GENERAL_SCOPE);
    let mut ordered: Vec<_> = groups.into_iter().collect();
    if let Some(general) = general {
        ordered.push((GENERAL_SCOPE.to_string(), general));
    }
    ordered
}

// Templates see commits as JSON, so the helper groups raw values. Anything
// that is not an array (e.g. a missing field) groups to nothing.
handlebars_helper!(group_by_scope_helper: |commits: Json| {
    let items = commits.as_array().map(Vec::as_slice).unwrap_or_default();
    let groups = group_with(items, |c: &Value| c.get("scope").and_then(Value::as_str));
    Value::Array(
        groups
            .into_iter()
            .map(|(scope, commits)| json!({ "scope": scope, "commits": commits }))
            .collect(),
    )
});

fn registry() -> Handlebars<'static> {
    let mut hb = Handlebars::new();
    // Output is Markdown, not HTML.
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_helper(GROUP_BY_SCOPE, Box::new(group_by_scope_helper));
    hb
}
