//! Version determination and computation.
//!
//! Versions travel through the pipeline as plain strings so that tag names,
//! template data, and API payloads never need semver-aware handling. Strict
//! parsing only happens at the edges: [`tags::select_latest`] validates tag
//! candidates, and [`increment`] rejects cores it cannot do arithmetic on.

pub mod tags;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),

    /// The `major.minor.patch` core of a version is not three integers.
    #[error("malformed version {version:?}: {reason}")]
    Malformed {
        /// The full version string that was rejected.
        version: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Semver bump level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl std::fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// A version split into its three textual segments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VersionParts<'a> {
    core: &'a str,
    prerelease: Option<&'a str>,
    build: Option<&'a str>,
}

impl<'a> VersionParts<'a> {
    /// Build metadata is split off at the first `+`, then the prerelease at
    /// the first `-` of what remains.
    fn split(version: &'a str) -> Self {
        let (base, build) = match version.split_once('+') {
            Some((base, build)) => (base, Some(build)),
            None => (version, None),
        };
        let (core, prerelease) = match base.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (base, None),
        };
        Self {
            core,
            prerelease,
            build,
        }
    }
}

/// Parse `major.minor.patch` into integers.
fn parse_core(version: &str, core: &str) -> VersionResult<(u64, u64, u64)> {
    let malformed = |reason: String| VersionError::Malformed {
        version: version.to_string(),
        reason,
    };

    let parts: Vec<&str> = core.split('.').collect();
    let [major, minor, patch] = parts.as_slice() else {
        return Err(malformed(format!(
            "expected major.minor.patch, found {} component(s)",
            parts.len()
        )));
    };

    let num = |label: &str, s: &str| {
        s.parse::<u64>()
            .map_err(|e| malformed(format!("{label} component {s:?}: {e}")))
    };
    Ok((num("major", *major)?, num("minor", *minor)?, num("patch", *patch)?))
}

/// Compute the next version string by applying a bump level.
///
/// Any prerelease segment is dropped, so a bump always yields a release
/// version. Build metadata is carried over verbatim.
///
/// # Errors
///
/// Returns [`VersionError::Malformed`] if the core is not three integers,
/// or if the bumped component would overflow `u64`.
pub fn increment(version: &str, level: BumpLevel) -> VersionResult<String> {
    let parts = VersionParts::split(version);
    let (major, minor, patch) = parse_core(version, parts.core)?;

    let overflow = |label: &str| VersionError::Malformed {
        version: version.to_string(),
        reason: format!("{label} component overflows on a {level} bump"),
    };
    let (major, minor, patch) = match level {
        BumpLevel::Patch => (major, minor, patch.checked_add(1).ok_or_else(|| overflow("patch"))?),
        BumpLevel::Minor => (major, minor.checked_add(1).ok_or_else(|| overflow("minor"))?, 0),
        BumpLevel::Major => (major.checked_add(1).ok_or_else(|| overflow("major"))?, 0, 0),
    };

    if let Some(pre) = parts.prerelease {
        debug!(%version, prerelease = pre, "dropping prerelease on bump");
    }

    let next = match parts.build {
        Some(build) => format!("{major}.{minor}.{patch}+{build}"),
        None => format!("{major}.{minor}.{patch}"),
    };
    info!(%version, %level, %next, "computed next version");
    Ok(next)
}

/// Validate that `s` is a strict semantic version.
///
/// # Errors
///
/// Returns [`VersionError::InvalidSemver`] when `s` does not parse.
pub fn validate(s: &str) -> VersionResult<semver::Version> {
    Ok(semver::Version::parse(s)?)
}
