//! Step outputs for CI runners.
//!
//! GitHub Actions passes a file path in `GITHUB_OUTPUT`; each `name=value`
//! line appended to it becomes a step output.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use drafty_core::reconcile::ReleaseOutputs;

/// Environment variable naming the step output file.
pub const ENV_GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";

/// Render outputs as `name=value` lines.
pub fn format_outputs(outputs: &ReleaseOutputs) -> String {
    outputs
        .pairs()
        .iter()
        .map(|(name, value)| format!("{name}={value}\n"))
        .collect()
}

/// Append outputs to `path`, creating it if needed.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn append_outputs(path: &Path, outputs: &ReleaseOutputs) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open output file {}", path.display()))?;
    file.write_all(format_outputs(outputs).as_bytes())
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    debug!(path = %path.display(), "wrote step outputs");
    Ok(())
}

/// Append outputs to the file named by `GITHUB_OUTPUT`, if set.
///
/// Returns the path written, or `None` outside a runner.
///
/// # Errors
///
/// Returns an error if the variable is set but the file cannot be written.
pub fn publish(outputs: &ReleaseOutputs) -> anyhow::Result<Option<PathBuf>> {
    let Some(path) = std::env::var_os(ENV_GITHUB_OUTPUT)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
    else {
        return Ok(None);
    };
    append_outputs(&path, outputs)?;
    Ok(Some(path))
}
