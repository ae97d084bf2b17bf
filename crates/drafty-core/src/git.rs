//! Local git lookups used to fill in defaults.
//!
//! Nothing here is required for a run: the reconciler talks to the host API
//! only. The local checkout just helps guess the repository and release
//! branch when they are not configured.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::host::{HostResult, RepoRef};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "remote").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Branch names tried, in order, when none is configured.
const BRANCH_CANDIDATES: &[&str] = &["main", "master"];

/// Detect the release branch by looking for `main`, then `master`.
///
/// Remote-tracking branches on `origin` count too, since CI checkouts often
/// have no local branch at all.
#[instrument]
pub fn detect_release_branch() -> GitResult<Option<String>> {
    for candidate in BRANCH_CANDIDATES {
        let refs = [
            format!("refs/heads/{candidate}"),
            format!("refs/remotes/origin/{candidate}"),
        ];
        if refs
            .iter()
            .any(|r| git(&["rev-parse", "--verify", "--quiet", r.as_str()]).is_ok())
        {
            debug!(branch = candidate, "detected release branch");
            return Ok(Some((*candidate).to_string()));
        }
    }
    debug!("no main/master branch found");
    Ok(None)
}

/// Get the URL of a named remote, or `None` if it does not exist.
#[instrument]
pub fn remote_url(remote: &str) -> GitResult<Option<String>> {
    match git(&["remote", "get-url", remote]) {
        Ok(url) => {
            let url = url.trim().to_string();
            debug!(%remote, %url, "remote URL");
            Ok(Some(url))
        }
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parse `owner/repo` out of a remote URL.
///
/// Handles `https://host/owner/repo(.git)`, `ssh://git@host/owner/repo(.git)`
/// and `git@host:owner/repo(.git)`.
pub fn parse_remote_url(url: &str) -> Option<RepoRef> {
    let url = url.trim();
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, path)| path),
        None => url.split_once(':').map(|(_, path)| path),
    }?;

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    path.parse().ok()
}

/// The repository to operate on.
///
/// Precedence: `explicit` (flag or config), then `env_repository` (normally
/// `GITHUB_REPOSITORY`), then the `origin` remote of the working tree.
///
/// # Errors
///
/// Returns an error if an explicitly given value is not `owner/repo`. A
/// missing or unparseable `origin` is not an error.
pub fn resolve_repository(
    explicit: Option<&str>,
    env_repository: Option<&str>,
) -> HostResult<Option<RepoRef>> {
    if let Some(repo) = [explicit, env_repository]
        .into_iter()
        .flatten()
        .find(|r| !r.trim().is_empty())
    {
        return repo.parse().map(Some);
    }
    let origin = remote_url("origin").ok().flatten();
    Ok(origin.as_deref().and_then(parse_remote_url))
}

/// Check if we're inside a git repository.
#[instrument]
pub fn is_inside_repo() -> GitResult<bool> {
    match git(&["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Run a git command and return its stdout.
fn git(args: &[&str]) -> GitResult<String> {
    let output = Command::new("git").args(args).output()?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.contains("not a git repository") {
        return Err(GitError::NotARepo);
    }
    Err(GitError::Command {
        command: args.first().unwrap_or(&"").to_string(),
        stderr,
    })
}
