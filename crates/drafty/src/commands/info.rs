//! Info command: show package and configuration information.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use drafty_core::config::{self, Config};
use drafty_core::reconcile::ReconcileOptions;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    release: ReleaseInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    github_repository: Option<String>,
}

/// Release settings after config is applied; flags are not considered.
#[derive(Serialize)]
struct ReleaseInfo {
    tag_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_branch: Option<String>,
    initial_version: String,
    template: &'static str,
    dry_run: bool,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &camino::Utf8Path) -> Self {
        let options = ReconcileOptions::from_config(config);
        let release = config.release.as_ref();
        let template = match release {
            Some(r) if r.notes_template.as_deref().is_some_and(|t| !t.trim().is_empty()) => {
                "inline"
            }
            Some(r) if r.notes_template_file.is_some() => "file",
            _ => "built-in",
        };

        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            release: ReleaseInfo {
                tag_prefix: options.tag_prefix,
                release_branch: release.and_then(|r| r.release_branch.clone()),
                initial_version: options.initial_version,
                template,
                dry_run: options.dry_run,
            },
            github_repository: config.github.as_ref().and_then(|g| g.repository.clone()),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
}

/// Print package information.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory for config discovery
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{} {}", info.package.name.bold(), info.package.version.green());
    if !info.package.description.is_empty() {
        println!("{}", info.package.description);
    }
    if !info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), info.package.license);
    }
    if !info.package.repository.is_empty() {
        println!("{}: {}", "Repository".dimmed(), info.package.repository.cyan());
    }

    println!();
    println!("{}", "Configuration".bold().underline());
    match &info.config.config_file {
        Some(path) => println!("{}: {}", "Config file".dimmed(), path.cyan()),
        None => println!("{}: {}", "Config file".dimmed(), "none loaded".yellow()),
    }
    println!("{}: {}", "Log level".dimmed(), info.config.log_level);
    if let Some(dir) = &info.config.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }

    let release = &info.config.release;
    println!();
    println!("{}", "Release".bold().underline());
    let prefix = if release.tag_prefix.is_empty() {
        "(none)"
    } else {
        release.tag_prefix.as_str()
    };
    println!("{}: {}", "Tag prefix".dimmed(), prefix.cyan());
    println!(
        "{}: {}",
        "Release branch".dimmed(),
        release
            .release_branch
            .as_deref()
            .unwrap_or("(detected)")
            .cyan()
    );
    println!("{}: {}", "Initial version".dimmed(), release.initial_version.cyan());
    println!("{}: {}", "Notes template".dimmed(), release.template.cyan());
    if release.dry_run {
        println!("{}: {}", "Dry run".dimmed(), "yes".yellow());
    }
    if let Some(repo) = &info.config.github_repository {
        println!("{}: {}", "GitHub repository".dimmed(), repo.cyan());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drafty_core::config::ReleaseConfig;

    fn test_cwd() -> camino::Utf8PathBuf {
        camino::Utf8PathBuf::from("/tmp")
    }

    #[test]
    fn test_cmd_info_text_succeeds() {
        assert!(cmd_info(InfoArgs::default(), false, &Config::default(), &test_cwd()).is_ok());
    }

    #[test]
    fn test_cmd_info_json_via_global() {
        assert!(cmd_info(InfoArgs::default(), true, &Config::default(), &test_cwd()).is_ok());
    }

    #[test]
    fn test_config_info_defaults() {
        let cwd = camino::Utf8PathBuf::from("/nonexistent");
        let info = ConfigInfo::from_config(&Config::default(), &cwd);
        assert!(info.config_file.is_none());
        assert_eq!(info.log_level, "info");
        assert_eq!(info.release.tag_prefix, "");
        assert_eq!(info.release.initial_version, "0.1.0");
        assert_eq!(info.release.template, "built-in");
    }

    #[test]
    fn test_config_info_release_section() {
        let config = Config {
            release: Some(ReleaseConfig {
                tag_prefix: Some("v".into()),
                notes_template_file: Some("notes.hbs".into()),
                ..ReleaseConfig::default()
            }),
            ..Config::default()
        };
        let info = ConfigInfo::from_config(&config, &test_cwd());
        assert_eq!(info.release.tag_prefix, "v");
        assert_eq!(info.release.template, "file");
    }
}
