//! The release host: where tags, commits, and releases live.
//!
//! [`ReleaseHost`] is the seam between the reconciler and GitHub. The
//! reconciler only ever talks to a `dyn ReleaseHost` (or a generic one), so
//! tests drive it with an in-memory fake and production uses
//! [`github::GitHubHost`].

pub mod github;
pub mod pages;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a release host.
#[derive(Error, Debug)]
pub enum HostError {
    /// Transport failure, or a response body that did not decode.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host answered with a non-success status.
    #[error("{operation} failed ({status}): {message}")]
    Api {
        /// What was being attempted, e.g. `list tags`.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Message from the response body, or the raw body.
        message: String,
    },

    /// An annotated tag chain did not reach a commit within the hop limit.
    #[error("tag object {sha} does not resolve to a commit after {hops} hops")]
    TagChainTooDeep {
        /// The tag object SHA reached at the limit.
        sha: String,
        /// How many tag objects were followed.
        hops: usize,
    },

    /// A repository identifier was not `owner/repo`.
    #[error("invalid repository {0:?}: expected owner/repo")]
    InvalidRepository(String),
}

/// Result alias for host operations.
pub type HostResult<T> = Result<T, HostError>;

// ──────────────────────────────────────────────
// Records
// ──────────────────────────────────────────────

/// A tag as listed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    /// Tag name, e.g. `v1.2.3`.
    pub name: String,
}

/// A commit as listed by the host, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    /// Full commit SHA.
    pub sha: String,
    /// Full commit message.
    pub message: String,
}

/// A release as listed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRef {
    /// Host-assigned release id.
    pub id: u64,
    /// Tag the release points at (may not exist yet for drafts).
    pub tag_name: String,
    /// Whether the release is still a draft.
    pub draft: bool,
    /// Browser URL of the release.
    pub url: String,
}

/// Payload for creating or updating a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    /// Tag name, prefix included.
    pub tag_name: String,
    /// Display name, the bare version.
    pub name: String,
    /// Rendered release notes.
    pub body: String,
    /// Whether the release is a draft.
    pub draft: bool,
    /// Branch or SHA the tag will be created from on publish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_commitish: Option<String>,
}

/// A release after a create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRelease {
    /// Host-assigned release id.
    pub id: u64,
    /// Browser URL of the release.
    pub url: String,
    /// Tag name of the release.
    pub tag_name: String,
}

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    /// Account or organization.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl FromStr for RepoRef {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HostError::InvalidRepository(s.to_string());
        let (owner, repo) = s.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

// ──────────────────────────────────────────────
// Trait
// ──────────────────────────────────────────────

/// Operations the reconciler needs from a repository host.
///
/// Implementations are bound to a single repository. Paged listings are
/// 1-based; an empty page means there is nothing further.
#[async_trait]
pub trait ReleaseHost: Send + Sync {
    /// One page of repository tags.
    async fn list_tags(&self, page: u32) -> HostResult<Vec<TagRef>>;

    /// One page of commits reachable from `head`, newest first.
    async fn list_commits(&self, head: &str, page: u32) -> HostResult<Vec<CommitRef>>;

    /// Resolve a ref such as `tags/v1.0.0` or `heads/main` to a commit SHA.
    ///
    /// Annotated tags are peeled to the commit they point at.
    async fn get_ref(&self, ref_name: &str) -> HostResult<String>;

    /// Every release in the repository, drafts included.
    async fn list_releases(&self) -> HostResult<Vec<ReleaseRef>>;

    /// Create a release.
    async fn create_release(&self, request: &ReleaseRequest) -> HostResult<PublishedRelease>;

    /// Replace an existing release's fields.
    async fn update_release(
        &self,
        id: u64,
        request: &ReleaseRequest,
    ) -> HostResult<PublishedRelease>;

    /// Delete a release. The tag, if any, is left alone.
    async fn delete_release(&self, id: u64) -> HostResult<()>;
}
