//! Doctor command: diagnose configuration and environment.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use drafty_core::config::{self, Config};
use drafty_core::git;

use super::ENV_REPOSITORY;

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    directories: DirectoryPaths,
    config: ConfigStatus,
    github: GitHubStatus,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to the project config file, if any
    file: Option<String>,
    /// Whether a config file was found
    found: bool,
}

#[derive(Serialize)]
struct GitHubStatus {
    /// Resolved `owner/repo`, if any
    repository: Option<String>,
    /// Why the repository could not be resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    repository_error: Option<String>,
    /// Whether a token is available
    token: bool,
    /// Whether the working directory is a git checkout
    inside_repo: bool,
    /// Local main/master branch, if detected
    detected_branch: Option<String>,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    /// Current working directory
    cwd: Option<String>,
    /// Relevant environment variables
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

impl EnvVar {
    fn read(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            value: std::env::var(name).ok(),
            description,
        }
    }
}

impl DoctorReport {
    fn gather(config: &Config, cwd: &camino::Utf8Path) -> Self {
        let config_file = config::find_project_config(cwd);

        let configured = config.github.as_ref().and_then(|g| g.repository.as_deref());
        let env_repository = std::env::var(ENV_REPOSITORY).ok();
        let (repository, repository_error) =
            match git::resolve_repository(configured, env_repository.as_deref()) {
                Ok(repo) => (repo.map(|r| r.to_string()), None),
                Err(e) => (None, Some(e.to_string())),
            };

        Self {
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
            },
            github: GitHubStatus {
                repository,
                repository_error,
                token: std::env::var("GITHUB_TOKEN").is_ok_and(|t| !t.trim().is_empty()),
                inside_repo: git::is_inside_repo().unwrap_or(false),
                detected_branch: git::detect_release_branch().ok().flatten(),
            },
            environment: EnvironmentInfo {
                cwd: Some(cwd.to_string()),
                env_vars: vec![
                    EnvVar::read(ENV_REPOSITORY, "Repository when not configured"),
                    EnvVar::read(crate::outputs::ENV_GITHUB_OUTPUT, "Step output file"),
                    EnvVar::read("XDG_CONFIG_HOME", "Override config directory"),
                    EnvVar::read("RUST_LOG", "Log filter directive"),
                    EnvVar::read("DRAFTY_LOG_PATH", "JSONL log file"),
                    EnvVar::read("DRAFTY_LOG_DIR", "JSONL log directory"),
                ],
            },
        }
    }
}

/// Run diagnostics and report configuration status.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory
#[instrument(name = "cmd_doctor", skip_all, fields(json_output))]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Gathering diagnostics...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let report = DoctorReport::gather(config, cwd);
    spinner.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Configuration".bold().underline());
    if report.config.found {
        println!(
            "  {} Config file: {}",
            "✓".green(),
            report.config.file.as_deref().unwrap_or("").cyan()
        );
    } else {
        println!("  {} No config file found", "○".yellow());
        offer_config_creation()?;
    }
    println!();

    println!("{}", "GitHub".bold().underline());
    match (&report.github.repository, &report.github.repository_error) {
        (Some(repo), _) => println!("  {} Repository: {}", "✓".green(), repo.cyan()),
        (None, Some(err)) => println!("  {} Repository: {}", "✗".red(), err.red()),
        (None, None) => println!(
            "  {} Repository not found; set github.repository or {ENV_REPOSITORY}",
            "○".yellow()
        ),
    }
    if report.github.token {
        println!("  {} GITHUB_TOKEN is set", "✓".green());
    } else {
        println!(
            "  {} GITHUB_TOKEN not set; drafts cannot be written",
            "○".yellow()
        );
    }
    if report.github.inside_repo {
        match &report.github.detected_branch {
            Some(branch) => println!("  {} Release branch: {}", "✓".green(), branch.cyan()),
            None => println!("  {} No main/master branch found", "○".yellow()),
        }
    } else {
        println!("  {} Not inside a git checkout", "○".dimmed());
    }
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", report.directories.config.as_deref());
    print_dir("  Data (local)", report.directories.data_local.as_deref());
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());

    let set_vars: Vec<_> = report
        .environment
        .env_vars
        .iter()
        .filter(|v| v.value.is_some())
        .collect();

    if set_vars.is_empty() {
        println!("  {} No overrides set", "○".dimmed());
    } else {
        for var in set_vars {
            println!(
                "  {}: {} {}",
                var.name.dimmed(),
                var.value.as_deref().unwrap_or("").cyan(),
                format!("({})", var.description).dimmed()
            );
        }
    }

    Ok(())
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to create a default config file when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };

    let config_path = config_dir.join("config.yaml");

    // Don't prompt if running non-interactively
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    if let Ok(true) = create {
        std::fs::create_dir_all(&config_dir)?;
        let yaml = serde_saphyr::to_string(&Config::default())?;
        std::fs::write(&config_path, yaml)?;
        println!("  {} Created {}", "✓".green(), config_path.cyan());
    }

    Ok(())
}
