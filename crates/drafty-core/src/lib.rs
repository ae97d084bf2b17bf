//! Core library for drafty.
//!
//! drafty reads a repository's tags and commits from GitHub, decides the
//! next semantic version from conventional commits, renders release notes,
//! and keeps exactly one draft release in sync with the release branch.
//!
//! # Modules
//!
//! - [`commits`] - Conventional-commit parsing, categorization, bump policy
//! - [`version`] - Version arithmetic and latest-tag selection
//! - [`notes`] - Handlebars release notes rendering
//! - [`host`] - The release host trait, pagination, and the GitHub transport
//! - [`reconcile`] - The end-to-end run and draft lifecycle
//! - [`config`] - Configuration loading and management
//! - [`git`] - Local checkout lookups for defaults
//! - [`sanitize`] - Log sanitizing for untrusted text
//! - [`error`] - Configuration error types
//!
//! # Quick Start
//!
//! ```no_run
//! use drafty_core::host::github::GitHubHost;
//! use drafty_core::reconcile::{reconcile, ReconcileOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let host = GitHubHost::new("octo/widgets".parse()?, std::env::var("GITHUB_TOKEN").ok())?;
//! let options = ReconcileOptions {
//!     tag_prefix: "v".into(),
//!     ..ReconcileOptions::default()
//! };
//! let outcome = reconcile(&host, &options, |_| {}).await?;
//! if let Some(outputs) = outcome.outputs() {
//!     println!("{}", outputs.release_url);
//! }
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod commits;

pub mod config;

pub mod error;

pub mod git;

pub mod host;

pub mod notes;

pub mod reconcile;

pub mod sanitize;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

pub use reconcile::{ReconcileOptions, ReconcileOutcome, reconcile};
