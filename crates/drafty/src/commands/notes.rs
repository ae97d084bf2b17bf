//! Notes command: preview the next release's notes without touching releases.

use anyhow::bail;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use drafty_core::config::Config;
use drafty_core::reconcile::ReconcileOutcome;

use super::RunArgs;

/// Arguments for the `notes` subcommand.
#[derive(Args, Debug, Default)]
pub struct NotesArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

/// Execute the notes command.
///
/// Always a dry run. Prints the rendered notes, or the whole plan with
/// `--json`.
#[instrument(name = "cmd_notes", skip_all)]
pub fn cmd_notes(
    args: NotesArgs,
    global_json: bool,
    quiet: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let options = args.run.options(config, true)?;
    let host = args.run.host(config)?;
    debug!(repo = %host.repo(), "rendering release notes preview");

    let outcome = super::run_reconcile(&host, &options, quiet || global_json)?;

    match &outcome {
        ReconcileOutcome::DryRun(plan) if global_json => {
            println!("{}", serde_json::to_string_pretty(plan)?);
        }
        ReconcileOutcome::DryRun(plan) => {
            print!("{}", plan.notes);
            if !plan.notes.ends_with('\n') {
                println!();
            }
        }
        _ if global_json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        ReconcileOutcome::NoCommits => {
            println!("{} No commits to describe", "○".yellow());
        }
        ReconcileOutcome::UpToDate { tag, .. } => {
            println!("{} Nothing new since {}", "✓".green(), tag.name.bold());
        }
        ReconcileOutcome::NoBumpNeeded { tag, .. } => {
            println!(
                "{} No releasable commits since {}",
                "○".yellow(),
                tag.name.bold()
            );
        }
        ReconcileOutcome::Released { .. } => {
            bail!("preview unexpectedly wrote a release");
        }
    }

    Ok(())
}
