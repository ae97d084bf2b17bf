//! Command implementations

pub mod doctor;

pub mod info;

pub mod notes;

pub mod release;

use anyhow::{Context, bail};
use camino::Utf8PathBuf;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::debug;

use drafty_core::config::Config;
use drafty_core::git;
use drafty_core::host::RepoRef;
use drafty_core::host::github::{DEFAULT_API_URL, GitHubHost};
use drafty_core::notes as release_notes;
use drafty_core::reconcile::{
    self, DEFAULT_RELEASE_BRANCH, ReconcileEvent, ReconcileOptions, ReconcileOutcome,
};

/// Environment variable naming the repository in GitHub Actions.
pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";

/// Arguments shared by every command that runs the reconciler.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Repository as owner/repo (default: config, $GITHUB_REPOSITORY, then origin)
    #[arg(long, value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Prefix for release tags (e.g., "v")
    #[arg(long, value_name = "PREFIX")]
    pub tag_prefix: Option<String>,

    /// Branch to release from (default: config, detected main/master, then "main")
    #[arg(long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Version for the first release when no tag exists
    #[arg(long, value_name = "VERSION")]
    pub initial_version: Option<String>,

    /// Handlebars template file for the release notes
    #[arg(long, value_name = "FILE")]
    pub template: Option<Utf8PathBuf>,
}

impl RunArgs {
    /// Merge flags over config over defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a template file cannot be read.
    pub fn options(&self, config: &Config, dry_run: bool) -> anyhow::Result<ReconcileOptions> {
        let mut options = ReconcileOptions::from_config(config);
        let release = config.release.as_ref();

        if let Some(prefix) = &self.tag_prefix {
            options.tag_prefix.clone_from(prefix);
        }
        if let Some(initial) = &self.initial_version {
            options.initial_version.clone_from(initial);
        }

        options.release_branch = match (&self.branch, release.and_then(|r| r.release_branch.as_ref())) {
            (Some(branch), _) | (None, Some(branch)) => branch.clone(),
            (None, None) => git::detect_release_branch()
                .ok()
                .flatten()
                .unwrap_or_else(|| DEFAULT_RELEASE_BRANCH.to_string()),
        };

        options.notes_template = match (&self.template, release) {
            (Some(path), _) => release_notes::load_template(path)
                .with_context(|| format!("failed to read template {path}"))?,
            (None, Some(release)) => release
                .resolve_notes_template()
                .context("failed to read configured notes template")?,
            (None, None) => String::new(),
        };

        options.dry_run |= dry_run;
        Ok(options)
    }

    /// The repository to operate on.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository is malformed or cannot be determined.
    pub fn repository(&self, config: &Config) -> anyhow::Result<RepoRef> {
        let configured = config.github.as_ref().and_then(|g| g.repository.as_deref());
        let env_repository = std::env::var(ENV_REPOSITORY).ok();
        match git::resolve_repository(
            self.repo.as_deref().or(configured),
            env_repository.as_deref(),
        )? {
            Some(repo) => Ok(repo),
            None => bail!(
                "could not determine the repository; pass --repo, set github.repository, or set {ENV_REPOSITORY}"
            ),
        }
    }

    /// Build the GitHub client for this run.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be resolved or the HTTP
    /// client cannot be built.
    pub fn host(&self, config: &Config) -> anyhow::Result<GitHubHost> {
        let repo = self.repository(config)?;
        let api_url = config
            .github
            .as_ref()
            .and_then(|g| g.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL);
        let token = self.token.clone().filter(|t| !t.trim().is_empty());
        if token.is_none() {
            debug!("no GitHub token; requests are anonymous");
        }
        let host = GitHubHost::new(repo, token)
            .context("failed to build GitHub client")?
            .with_base_url(api_url);
        Ok(host)
    }
}

/// Run the reconciler on a current-thread runtime, showing progress on
/// stderr unless `quiet`.
///
/// # Errors
///
/// Returns an error if the runtime cannot start or the run fails.
pub fn run_reconcile(
    host: &GitHubHost,
    options: &ReconcileOptions,
    quiet: bool,
) -> anyhow::Result<ReconcileOutcome> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let mut progress = Progress::new(quiet);
    let outcome = runtime.block_on(reconcile::reconcile(host, options, |event| {
        progress.handle(event);
    }));
    progress.clear();
    outcome.with_context(|| format!("release run for {} failed", host.repo()))
}

/// Spinner per step, a summary line when it finishes.
struct Progress {
    quiet: bool,
    spinner: Option<ProgressBar>,
}

impl Progress {
    const fn new(quiet: bool) -> Self {
        Self {
            quiet,
            spinner: None,
        }
    }

    fn handle(&mut self, event: ReconcileEvent) {
        if self.quiet {
            return;
        }
        match event {
            ReconcileEvent::Started(step) => {
                self.clear();
                let spinner = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
                    spinner.set_style(
                        style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
                    );
                }
                spinner.set_message(format!("{step}..."));
                spinner.enable_steady_tick(std::time::Duration::from_millis(80));
                self.spinner = Some(spinner);
            }
            ReconcileEvent::Finished(step, summary) => {
                self.clear();
                eprintln!(
                    "  {} {} {}",
                    "✓".green(),
                    step.to_string().bold(),
                    summary.dimmed()
                );
            }
        }
    }

    fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}
