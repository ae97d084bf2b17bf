//! Release reconciler: the full tags → commits → version → notes → draft run.
//!
//! # Flow
//!
//! 1. Drain the tag listing and pick the latest version for the prefix.
//! 2. With no prior version, scan the whole branch history and release at
//!    the configured initial version.
//! 3. Otherwise compare the tag and branch-head SHAs; equal means there is
//!    nothing to release.
//! 4. Scan commits from the head back to the tag, categorize, and bump.
//! 5. Render notes. A dry run stops here.
//! 6. Update the draft for the target tag (or create one), then delete every
//!    other draft.
//!
//! No-op endings are [`ReconcileOutcome`] variants, not errors. Any host
//! failure aborts the run where it happened.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::commits::{self, CategorizedCommits, Commit};
use crate::config::Config;
use crate::host::{
    CommitRef, HostError, PublishedRelease, ReleaseHost, ReleaseRef, ReleaseRequest, pages,
};
use crate::notes::{self, NotesError, ReleaseNotesData};
use crate::sanitize;
use crate::version::tags::{self, Tag};
use crate::version::{self, BumpLevel, VersionError};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from a reconcile run.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A host call failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Version arithmetic failed.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Notes rendering failed.
    #[error(transparent)]
    Notes(#[from] NotesError),

    /// The configured initial version is not a semantic version.
    #[error("invalid initial version {version:?}: {source}")]
    InvalidInitialVersion {
        /// The rejected value.
        version: String,
        /// Why it was rejected.
        source: VersionError,
    },
}

/// Result alias for reconcile operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

// ──────────────────────────────────────────────
// Options
// ──────────────────────────────────────────────

/// Version used when no prior release tag exists.
pub const DEFAULT_INITIAL_VERSION: &str = "0.1.0";

/// Branch assumed when nothing else names one.
pub const DEFAULT_RELEASE_BRANCH: &str = "main";

/// Knobs for one reconcile run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Prefix tags carry before the version, e.g. `v`.
    pub tag_prefix: String,
    /// Branch whose head is released.
    pub release_branch: String,
    /// Handlebars template for the notes; empty selects the built-in one.
    pub notes_template: String,
    /// Compute and log, but never mutate releases.
    pub dry_run: bool,
    /// Version for the first release of a repository.
    pub initial_version: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            tag_prefix: String::new(),
            release_branch: DEFAULT_RELEASE_BRANCH.to_string(),
            notes_template: String::new(),
            dry_run: false,
            initial_version: DEFAULT_INITIAL_VERSION.to_string(),
        }
    }
}

impl ReconcileOptions {
    /// Options from the `[release]` config section, defaults elsewhere.
    ///
    /// A template file is not read here; callers resolve it and set
    /// [`notes_template`](Self::notes_template).
    pub fn from_config(config: &Config) -> Self {
        let mut opts = Self::default();
        let Some(release) = config.release.as_ref() else {
            return opts;
        };
        if let Some(prefix) = &release.tag_prefix {
            opts.tag_prefix.clone_from(prefix);
        }
        if let Some(branch) = &release.release_branch {
            opts.release_branch.clone_from(branch);
        }
        if let Some(template) = &release.notes_template {
            opts.notes_template.clone_from(template);
        }
        if let Some(initial) = &release.initial_version {
            opts.initial_version.clone_from(initial);
        }
        opts.dry_run = release.dry_run.unwrap_or(false);
        opts
    }

    /// The tag a release of `version` gets.
    pub fn tag_name(&self, version: &str) -> String {
        format!("{}{version}", self.tag_prefix)
    }
}

// ──────────────────────────────────────────────
// Steps and events
// ──────────────────────────────────────────────

/// Steps of a reconcile run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStep {
    /// Listing tags and picking the latest version.
    Tags,
    /// Scanning commits since the latest version.
    Commits,
    /// Rendering release notes.
    Notes,
    /// Creating or updating the draft release.
    Release,
    /// Deleting stale drafts.
    Cleanup,
}

impl std::fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tags => write!(f, "tags"),
            Self::Commits => write!(f, "commits"),
            Self::Notes => write!(f, "notes"),
            Self::Release => write!(f, "release"),
            Self::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Progress events, for spinners and the like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// A step has started.
    Started(ReconcileStep),
    /// A step has finished, with a one-line summary.
    Finished(ReconcileStep, String),
}

// ──────────────────────────────────────────────
// Plan and outcome
// ──────────────────────────────────────────────

/// Everything computed before any release is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    /// The latest prior release, if any.
    pub previous: Option<Tag>,
    /// The bump applied to `previous`; `None` for an initial release.
    pub bump: Option<BumpLevel>,
    /// The new version, without prefix.
    pub version: String,
    /// The new tag name, with prefix.
    pub tag_name: String,
    /// Number of commits considered.
    pub commit_count: usize,
    /// Commits by release-notes section.
    pub commits: CategorizedCommits,
    /// Rendered release notes.
    pub notes: String,
}

/// Values a successful release publishes to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseOutputs {
    /// Browser URL of the draft.
    pub release_url: String,
    /// Host id of the draft.
    pub release_id: u64,
    /// The tag name, prefix included.
    pub version: String,
}

impl ReleaseOutputs {
    /// Output name/value pairs in a fixed order.
    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            ("release-url", self.release_url.clone()),
            ("release-id", self.release_id.to_string()),
            ("version", self.version.clone()),
        ]
    }
}

/// How a reconcile run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ReconcileOutcome {
    /// No prior release and no commits on the branch.
    NoCommits,
    /// The latest tag already points at the branch head.
    UpToDate {
        /// The latest tag.
        tag: Tag,
        /// The SHA both refs resolve to.
        sha: String,
    },
    /// Commits exist since the latest tag, but none warrant a release.
    NoBumpNeeded {
        /// The latest tag.
        tag: Tag,
        /// Number of commits scanned.
        commit_count: usize,
    },
    /// Dry run: what would have been released.
    DryRun(ReleasePlan),
    /// A draft was created or updated.
    Released {
        /// What was released.
        plan: ReleasePlan,
        /// The draft as returned by the host.
        release: PublishedRelease,
        /// Whether an existing draft was updated rather than created.
        updated: bool,
        /// Ids of stale drafts that were deleted.
        deleted: Vec<u64>,
    },
}

impl ReconcileOutcome {
    /// Values to publish, present only when a draft was written.
    pub fn outputs(&self) -> Option<ReleaseOutputs> {
        match self {
            Self::Released { release, .. } => Some(ReleaseOutputs {
                release_url: release.url.clone(),
                release_id: release.id,
                version: release.tag_name.clone(),
            }),
            _ => None,
        }
    }

    /// The computed plan, if the run got that far.
    pub const fn plan(&self) -> Option<&ReleasePlan> {
        match self {
            Self::DryRun(plan) | Self::Released { plan, .. } => Some(plan),
            _ => None,
        }
    }
}

/// Which drafts to update and delete for a target tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftCleanup {
    /// The draft already carrying the target tag, to update in place.
    pub target: Option<u64>,
    /// Every other draft.
    pub stale: Vec<u64>,
}

/// Split a release listing into the draft to reuse and the drafts to delete.
///
/// Published releases never appear in either. If several drafts carry the
/// target tag, the first one listed is reused and the rest are stale.
pub fn plan_cleanup(releases: &[ReleaseRef], tag_name: &str) -> DraftCleanup {
    let drafts = releases.iter().filter(|r| r.draft);
    let target = drafts.clone().find(|r| r.tag_name == tag_name).map(|r| r.id);
    let stale = drafts.map(|r| r.id).filter(|id| Some(*id) != target).collect();
    DraftCleanup { target, stale }
}

// ──────────────────────────────────────────────
// Reconcile
// ──────────────────────────────────────────────

/// Run the reconciler against `host`.
///
/// `on_event` is called at step boundaries.
///
/// # Errors
///
/// Returns the first host, version, or template error. Drafts deleted before
/// a failing delete stay deleted.
#[instrument(skip_all, fields(
    branch = %options.release_branch,
    prefix = %options.tag_prefix,
    dry_run = options.dry_run
))]
pub async fn reconcile<H: ReleaseHost + ?Sized>(
    host: &H,
    options: &ReconcileOptions,
    mut on_event: impl FnMut(ReconcileEvent),
) -> ReconcileResult<ReconcileOutcome> {
    on_event(ReconcileEvent::Started(ReconcileStep::Tags));
    let all_tags = pages::drain(move |page| host.list_tags(page)).await?;
    let latest = tags::select_latest(&all_tags, &options.tag_prefix);
    on_event(ReconcileEvent::Finished(
        ReconcileStep::Tags,
        latest.as_ref().map_or_else(
            || format!("{} tags, no prior release", all_tags.len()),
            |t| format!("{} tags, latest {}", all_tags.len(), t.name),
        ),
    ));

    let branch = options.release_branch.as_str();
    on_event(ReconcileEvent::Started(ReconcileStep::Commits));

    let (commit_count, categorized, version, bump) = match &latest {
        None => {
            let version = version::validate(&options.initial_version)
                .map_err(|source| ReconcileError::InvalidInitialVersion {
                    version: options.initial_version.clone(),
                    source,
                })?
                .to_string();
            let raw = pages::drain(move |page| host.list_commits(branch, page)).await?;
            on_event(ReconcileEvent::Finished(
                ReconcileStep::Commits,
                format!("{} commits in full history", raw.len()),
            ));
            if raw.is_empty() {
                warn!(%branch, "no prior release and no commits; nothing to release");
                return Ok(ReconcileOutcome::NoCommits);
            }
            info!(%version, "no prior release; using initial version");
            (raw.len(), categorize_all(&raw), version, None)
        }
        Some(tag) => {
            let tag_sha = host.get_ref(&format!("tags/{}", tag.name)).await?;
            let head_sha = host.get_ref(&format!("heads/{branch}")).await?;
            debug!(%tag_sha, %head_sha, "resolved refs");

            if tag_sha == head_sha {
                info!(tag = %tag.name, sha = %head_sha, "branch head is already released");
                on_event(ReconcileEvent::Finished(
                    ReconcileStep::Commits,
                    "no commits since latest tag".into(),
                ));
                return Ok(ReconcileOutcome::UpToDate {
                    tag: tag.clone(),
                    sha: head_sha,
                });
            }

            let head = head_sha.as_str();
            let raw = pages::take_until(
                move |page| host.list_commits(head, page),
                |c: &CommitRef| c.sha == tag_sha,
            )
            .await?;
            on_event(ReconcileEvent::Finished(
                ReconcileStep::Commits,
                format!("{} commits since {}", raw.len(), tag.name),
            ));

            let categorized = categorize_all(&raw);
            let Some(level) = commits::determine_bump(&categorized) else {
                info!(tag = %tag.name, commits = raw.len(), "no releasable changes");
                return Ok(ReconcileOutcome::NoBumpNeeded {
                    tag: tag.clone(),
                    commit_count: raw.len(),
                });
            };
            let next = version::increment(&tag.version, level)?;
            (raw.len(), categorized, next, Some(level))
        }
    };

    let tag_name = options.tag_name(&version);

    on_event(ReconcileEvent::Started(ReconcileStep::Notes));
    let notes = notes::render_notes(
        &options.notes_template,
        &ReleaseNotesData {
            version: version.clone(),
            commits: categorized.clone(),
        },
    )?;
    on_event(ReconcileEvent::Finished(
        ReconcileStep::Notes,
        format!("{} bytes", notes.len()),
    ));

    let plan = ReleasePlan {
        previous: latest,
        bump,
        version,
        tag_name,
        commit_count,
        commits: categorized,
        notes,
    };

    if options.dry_run {
        info!(
            version = %plan.version,
            tag = %plan.tag_name,
            notes = %sanitize::for_log(&plan.notes),
            "dry run; no release changes made"
        );
        return Ok(ReconcileOutcome::DryRun(plan));
    }

    publish(host, options, plan, &mut on_event).await
}

fn categorize_all(raw: &[CommitRef]) -> CategorizedCommits {
    let parsed: Vec<Commit> = raw.iter().map(|c| commits::parse_commit(&c.message)).collect();
    commits::categorize(&parsed)
}

/// Write the draft and clear out the others.
async fn publish<H: ReleaseHost + ?Sized>(
    host: &H,
    options: &ReconcileOptions,
    plan: ReleasePlan,
    on_event: &mut impl FnMut(ReconcileEvent),
) -> ReconcileResult<ReconcileOutcome> {
    on_event(ReconcileEvent::Started(ReconcileStep::Release));
    let releases = host.list_releases().await?;
    let cleanup = plan_cleanup(&releases, &plan.tag_name);

    let request = ReleaseRequest {
        tag_name: plan.tag_name.clone(),
        name: plan.version.clone(),
        body: plan.notes.clone(),
        draft: true,
        target_commitish: Some(options.release_branch.clone()),
    };

    let release = match cleanup.target {
        Some(id) => {
            info!(id, tag = %plan.tag_name, "updating existing draft");
            host.update_release(id, &request).await?
        }
        None => {
            info!(tag = %plan.tag_name, "creating draft");
            host.create_release(&request).await?
        }
    };
    on_event(ReconcileEvent::Finished(
        ReconcileStep::Release,
        format!("draft {} ({})", release.tag_name, release.url),
    ));

    on_event(ReconcileEvent::Started(ReconcileStep::Cleanup));
    let mut deleted = Vec::new();
    for id in cleanup.stale.into_iter().filter(|id| *id != release.id) {
        info!(id, "deleting stale draft");
        host.delete_release(id).await?;
        deleted.push(id);
    }
    on_event(ReconcileEvent::Finished(
        ReconcileStep::Cleanup,
        format!("{} stale drafts deleted", deleted.len()),
    ));

    info!(id = release.id, url = %release.url, tag = %release.tag_name, "draft release ready");
    Ok(ReconcileOutcome::Released {
        plan,
        updated: cleanup.target.is_some(),
        release,
        deleted,
    })
}
