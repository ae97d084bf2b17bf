//! Configuration loading and discovery.
//!
//! Sources are layered with figment, lowest precedence first:
//! 1. Built-in defaults
//! 2. User config in the XDG config directory
//! 3. Project config, found by walking up from the search root
//! 4. Explicit files added with [`ConfigLoader::with_file`]
//!
//! # Supported formats
//!
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `.drafty.<ext>` in current directory or any parent
//! - `drafty.<ext>` in current directory or any parent
//! - `~/.config/drafty/config.<ext>` (user config)
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use drafty_core::config::ConfigLoader;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! ```
//!
//! The GitHub token is never read from config files; it comes from the
//! command line or `GITHUB_TOKEN` only.

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::notes::{self, NotesResult};

/// The configuration for drafty.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files. No file log is written when unset.
    pub log_dir: Option<Utf8PathBuf>,
    /// Release computation settings.
    pub release: Option<ReleaseConfig>,
    /// GitHub repository settings.
    pub github: Option<GitHubConfig>,
}

/// The `[release]` section.
///
/// Every field is optional; command-line flags override what is set here.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReleaseConfig {
    /// Prefix tags carry before the version, e.g. `"v"`. Default: none.
    pub tag_prefix: Option<String>,
    /// Branch to release from. Default: detected `main`/`master`, else `main`.
    pub release_branch: Option<String>,
    /// Version for the first release when no tag matches. Default: `0.1.0`.
    pub initial_version: Option<String>,
    /// Inline Handlebars template for the release notes.
    pub notes_template: Option<String>,
    /// Path to a Handlebars template file. `notes_template` wins if both are set.
    pub notes_template_file: Option<Utf8PathBuf>,
    /// Never touch releases; only compute and log.
    pub dry_run: Option<bool>,
}

impl ReleaseConfig {
    /// The notes template this section selects, or an empty string for the
    /// built-in one.
    ///
    /// # Errors
    ///
    /// Returns an error if `notes_template_file` is set and cannot be read.
    pub fn resolve_notes_template(&self) -> NotesResult<String> {
        if let Some(inline) = self.notes_template.as_deref().filter(|t| !t.trim().is_empty()) {
            return Ok(inline.to_string());
        }
        match &self.notes_template_file {
            Some(path) => notes::load_template(path),
            None => Ok(String::new()),
        }
    }
}

/// The `[github]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GitHubConfig {
    /// `owner/repo`. Default: `GITHUB_REPOSITORY`, then the `origin` remote.
    pub repository: Option<String>,
    /// API root, for GitHub Enterprise. Default: `https://api.github.com`.
    pub api_url: Option<String>,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
pub const APP_NAME: &str = "drafty";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    project_search_root: Option<Utf8PathBuf>,
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a loader that reads user config and stops at `.git`.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Walk up from `path` looking for a project config file.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/drafty/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Stop the upward walk at a directory containing `marker`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Search all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file. Later files win.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Deserialize`] if a file is unreadable or does
    /// not match the schema.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        for path in self.sources() {
            tracing::debug!(%path, "merging config file");
            figment = Self::merge_file(figment, &path);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Config files that would be merged, lowest precedence first.
    pub fn sources(&self) -> Vec<Utf8PathBuf> {
        let mut sources = Vec::new();
        if self.include_user_config
            && let Some(user) = find_user_config()
        {
            sources.push(user);
        }
        if let Some(root) = &self.project_search_root
            && let Some(project) = self.find_project_config(root)
        {
            sources.push(project);
        }
        sources.extend(self.explicit_files.iter().cloned());
        sources
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            let found = CONFIG_EXTENSIONS.iter().find_map(|ext| {
                [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
                    .into_iter()
                    .map(|name| dir.join(name))
                    .find(|path| path.is_file())
            });
            if found.is_some() {
                return found;
            }

            // The directory holding the marker is the last one searched.
            if let Some(marker) = &self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }
        }
        None
    }

    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

/// Find the project config file [`ConfigLoader::new`] would load, without
/// loading it. The search stops at the `.git` boundary.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new().find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// The user config directory, e.g. `~/.config/drafty/` on Linux.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// The machine-local data directory, e.g. `~/.local/share/drafty/` on Linux.
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> Utf8PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        Utf8PathBuf::try_from(path).unwrap()
    }

    fn load(path: &Utf8Path) -> Config {
        ConfigLoader::new()
            .with_user_config(false)
            .with_file(path)
            .load()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert!(config.release.is_none());
        assert!(config.github.is_none());
    }

    #[test]
    fn test_loader_builds_with_defaults() {
        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .load()
            .unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_single_file_overrides_default() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "config.toml",
            r#"log_level = "debug"
log_dir = "/tmp/drafty"
"#,
        );
        let config = load(&path);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.log_dir.as_deref().map(Utf8Path::as_str), Some("/tmp/drafty"));
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();
        let base = write(&tmp, "base.toml", "[release]\ntag_prefix = \"v\"\nrelease_branch = \"dev\"\n");
        let over = write(&tmp, "over.toml", "[release]\ntag_prefix = \"app-v\"\n");

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&base)
            .with_file(&over)
            .load()
            .unwrap();

        let release = config.release.unwrap();
        assert_eq!(release.tag_prefix.as_deref(), Some("app-v"));
        assert_eq!(release.release_branch.as_deref(), Some("dev"));
    }

    #[test]
    fn test_project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project_dir = tmp.path().join("project");
        let sub_dir = project_dir.join("src").join("deep");
        fs::create_dir_all(&sub_dir).unwrap();
        fs::write(project_dir.join(".drafty.toml"), r#"log_level = "debug""#).unwrap();

        let sub_dir = Utf8PathBuf::try_from(sub_dir).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&sub_dir)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_dotfile_preferred_over_plain_name() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, ".drafty.toml", r#"log_level = "warn""#);
        write(&tmp, "drafty.toml", r#"log_level = "error""#);
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let found = find_project_config(&root).unwrap();
        assert_eq!(found.file_name(), Some(".drafty.toml"));
    }

    #[test]
    fn test_boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();
        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(parent.join(".drafty.toml"), r#"log_level = "warn""#).unwrap();
        fs::create_dir(child.join(".git")).unwrap();

        let work = Utf8PathBuf::try_from(work).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_boundary_marker(".git")
            .with_project_search(&work)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_explicit_file_overrides_project_config() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, ".drafty.toml", r#"log_level = "warn""#);
        let over = write(&tmp, "override.toml", r#"log_level = "error""#);
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let loader = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&root)
            .with_file(&over);
        assert_eq!(loader.sources().len(), 2);

        assert_eq!(loader.load().unwrap().log_level, LogLevel::Error);
    }

    #[test]
    fn test_config_beside_boundary_marker_is_found() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        let src = repo.join("src");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        fs::write(repo.join(".drafty.toml"), r#"log_level = "debug""#).unwrap();

        let src = Utf8PathBuf::try_from(src).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(&src)
            .load()
            .unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);

        let root = Utf8PathBuf::try_from(repo).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(&root)
            .load()
            .unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_find_project_config_respects_boundary() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        let src = repo.join("src");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        fs::write(tmp.path().join(".drafty.toml"), r#"log_level = "warn""#).unwrap();

        let src = Utf8PathBuf::try_from(src).unwrap();
        assert_eq!(find_project_config(&src), None);

        fs::write(repo.join("drafty.yaml"), "log_level: debug\n").unwrap();
        let found = find_project_config(&src).unwrap();
        assert_eq!(found.file_name(), Some("drafty.yaml"));
    }

    #[test]
    fn test_invalid_value_is_deserialize_error() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "bad.toml", r#"log_level = "loud""#);
        let result = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&path)
            .load();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_release_and_github_sections() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "config.toml",
            r#"
[release]
tag_prefix = "v"
release_branch = "trunk"
initial_version = "1.0.0"
dry_run = true

[github]
repository = "octo/widgets"
api_url = "https://ghe.example.com/api/v3"
"#,
        );

        let config = load(&path);
        let release = config.release.unwrap();
        assert_eq!(release.tag_prefix.as_deref(), Some("v"));
        assert_eq!(release.release_branch.as_deref(), Some("trunk"));
        assert_eq!(release.initial_version.as_deref(), Some("1.0.0"));
        assert_eq!(release.dry_run, Some(true));

        let github = config.github.unwrap();
        assert_eq!(github.repository.as_deref(), Some("octo/widgets"));
        assert_eq!(github.api_url.as_deref(), Some("https://ghe.example.com/api/v3"));
    }

    #[test]
    fn test_yaml_config() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.yaml", "release:\n  tag_prefix: v\n");
        let config = load(&path);
        assert_eq!(config.release.unwrap().tag_prefix.as_deref(), Some("v"));
    }

    #[test]
    fn test_inline_template_wins_over_file() {
        let tmp = TempDir::new().unwrap();
        let file = write(&tmp, "notes.hbs", "from file {{version}}");
        let release = ReleaseConfig {
            notes_template: Some("inline {{version}}".into()),
            notes_template_file: Some(file.clone()),
            ..ReleaseConfig::default()
        };
        assert_eq!(release.resolve_notes_template().unwrap(), "inline {{version}}");

        let release = ReleaseConfig {
            notes_template_file: Some(file),
            ..ReleaseConfig::default()
        };
        assert_eq!(release.resolve_notes_template().unwrap(), "from file {{version}}");
    }

    #[test]
    fn test_no_template_means_builtin() {
        assert_eq!(ReleaseConfig::default().resolve_notes_template().unwrap(), "");
    }

    #[test]
    fn test_missing_template_file_is_an_error() {
        let release = ReleaseConfig {
            notes_template_file: Some("/nonexistent/notes.hbs".into()),
            ..ReleaseConfig::default()
        };
        assert!(release.resolve_notes_template().is_err());
    }

    #[test]
    fn test_user_config_dir() {
        if let Some(path) = user_config_dir() {
            assert!(path.as_str().contains("drafty"));
        }
    }
}
