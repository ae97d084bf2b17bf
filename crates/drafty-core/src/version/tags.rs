//! Latest-release selection from a repository's tag list.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::host::TagRef;

/// A release tag whose prefix-stripped name is a valid semantic version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Full tag name, e.g. `v1.2.3`.
    pub name: String,
    /// Tag name without the configured prefix, e.g. `1.2.3`.
    pub version: String,
}

impl Tag {
    /// Interpret a tag name under `prefix`.
    ///
    /// Returns `None` when the name lacks the prefix or the remainder is not
    /// a strict semantic version.
    pub fn from_name(name: &str, prefix: &str) -> Option<Self> {
        let version = name.strip_prefix(prefix)?;
        semver::Version::parse(version).ok()?;
        Some(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// The `major.minor.patch` triple with prerelease and build stripped.
    fn core(&self) -> (u64, u64, u64) {
        // Only constructed via `from_name`, so the version is known to parse.
        semver::Version::parse(&self.version)
            .map(|v| (v.major, v.minor, v.patch))
            .unwrap_or_default()
    }
}

/// Select the highest version tag for `prefix`.
///
/// Candidates are compared on `major.minor.patch` alone; prerelease and build
/// suffixes do not participate, so `1.1.0-alpha.1` ties with `1.1.0`. On a
/// tie the earliest candidate in `tags` wins.
#[instrument(skip(tags), fields(count = tags.len()))]
pub fn select_latest(tags: &[TagRef], prefix: &str) -> Option<Tag> {
    let mut best: Option<Tag> = None;
    for tag in tags.iter().filter_map(|t| Tag::from_name(&t.name, prefix)) {
        if best.as_ref().is_none_or(|current| tag.core() > current.core()) {
            best = Some(tag);
        }
    }

    match best {
        Some(ref tag) => info!(name = %tag.name, version = %tag.version, "latest version found"),
        None => warn!(%prefix, "no valid version tags found"),
    }
    debug!(?best, "selected latest tag");
    best
}
