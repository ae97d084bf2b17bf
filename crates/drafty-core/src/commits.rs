//! Conventional-commit parsing and categorization.
//!
//! Parsing is total: any message that does not look like a conventional
//! commit becomes a `chore` with its first line as the subject. Nothing in
//! this module can fail.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::sanitize;
use crate::version::BumpLevel;

/// Commit types recognized in the `type` position of a conventional commit.
pub const COMMIT_TYPES: &[&str] = &[
    "feat", "fix", "chore", "docs", "refactor", "perf", "test", "ci", "style", "revert", "build",
];

/// Type assigned to messages that do not match the conventional format.
pub const FALLBACK_TYPE: &str = "chore";

/// Tokens that mark a breaking change when found in a message.
const BREAKING_MARKERS: &[&str] = &["BREAKING CHANGE:", "BREAKING-CHANGE:"];

/// `<type><!?>(<scope>)?<!?>: <subject>` on the first line.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    let types = COMMIT_TYPES.join("|");
    Regex::new(&format!(r"^({types})(!?)(?:\(([^)]+)\))?(!?): (.+)$"))
        .unwrap_or_else(|e| unreachable!("commit header pattern is valid: {e}"))
});

/// A single parsed commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Conventional type (`feat`, `fix`, ...), or `chore` for unparseable messages.
    #[serde(rename = "type")]
    pub commit_type: String,
    /// Scope from `type(scope): ...`, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Text after `: ` on the first line.
    pub subject: String,
    /// The first line of the original message.
    pub message: String,
    /// Whether this commit introduces a breaking change.
    pub breaking: bool,
}

impl Commit {
    /// Whether this is a `feat` commit.
    pub fn is_feature(&self) -> bool {
        self.commit_type == "feat"
    }

    /// Whether this is a `fix` commit.
    pub fn is_fix(&self) -> bool {
        self.commit_type == "fix"
    }
}

/// Parse one raw commit message.
pub fn parse_commit(raw: &str) -> Commit {
    let first_line = raw.lines().next().unwrap_or_default();

    let Some(caps) = HEADER_RE.captures(first_line) else {
        debug!(message = %sanitize::for_log(first_line), "not a conventional commit");
        return Commit {
            commit_type: FALLBACK_TYPE.to_string(),
            scope: None,
            subject: first_line.to_string(),
            message: first_line.to_string(),
            breaking: false,
        };
    };

    let bang = !caps[2].is_empty() || !caps[4].is_empty();
    Commit {
        commit_type: caps[1].to_string(),
        scope: caps.get(3).map(|m| m.as_str().to_string()),
        subject: caps[5].to_string(),
        message: first_line.to_string(),
        breaking: bang || mentions_breaking_change(raw),
    }
}

/// Whether the message carries a breaking-change token anywhere.
///
/// A token quoted in a bullet or in prose also counts.
fn mentions_breaking_change(raw: &str) -> bool {
    BREAKING_MARKERS.iter().any(|m| raw.contains(m))
}

/// Commits partitioned by release-notes section.
///
/// The partition is not exclusive: a breaking `feat` appears in both
/// `features` and `breaking`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedCommits {
    /// `feat` commits.
    pub features: Vec<Commit>,
    /// `fix` commits.
    pub fixes: Vec<Commit>,
    /// Commits flagged as breaking, of any type.
    pub breaking: Vec<Commit>,
}

impl CategorizedCommits {
    /// True when no bucket has any commit.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.fixes.is_empty() && self.breaking.is_empty()
    }
}

/// Partition commits into features, fixes, and breaking changes.
#[instrument(skip_all, fields(count = commits.len()))]
pub fn categorize(commits: &[Commit]) -> CategorizedCommits {
    let pick = |pred: fn(&Commit) -> bool| commits.iter().filter(|c| pred(c)).cloned().collect();

    let categorized = CategorizedCommits {
        features: pick(Commit::is_feature),
        fixes: pick(Commit::is_fix),
        breaking: pick(|c| c.breaking),
    };
    debug!(
        features = categorized.features.len(),
        fixes = categorized.fixes.len(),
        breaking = categorized.breaking.len(),
        "categorized commits"
    );
    categorized
}

/// Pick the bump implied by the most significant category present.
pub fn determine_bump(categorized: &CategorizedCommits) -> Option<BumpLevel> {
    if !categorized.breaking.is_empty() {
        Some(BumpLevel::Major)
    } else if !categorized.features.is_empty() {
        Some(BumpLevel::Minor)
    } else if !categorized.fixes.is_empty() {
        Some(BumpLevel::Patch)
    } else {
        None
    }
}
