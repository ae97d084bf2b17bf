//! Release command: thin CLI layer over `drafty_core::reconcile`.

use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, info, instrument};

use drafty_core::config::Config;
use drafty_core::reconcile::{ReconcileOptions, ReconcileOutcome, ReleasePlan};

use super::RunArgs;
use crate::outputs;

/// Arguments for the `release` subcommand.
#[derive(Args, Debug, Default)]
pub struct ReleaseArgs {
    /// Compute the release and print the notes without touching releases
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Execute the release command.
#[instrument(name = "cmd_release", skip_all)]
pub fn cmd_release(
    args: ReleaseArgs,
    global_json: bool,
    quiet: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let options = args.run.options(config, args.dry_run)?;
    let host = args.run.host(config)?;
    debug!(
        repo = %host.repo(),
        branch = %options.release_branch,
        dry_run = options.dry_run,
        "executing release command"
    );

    if options.dry_run && !global_json && !quiet {
        println!("{}", "DRY RUN: no releases will be changed".yellow().bold());
    }

    let outcome = super::run_reconcile(&host, &options, quiet || global_json)?;

    let written = match outcome.outputs() {
        Some(values) => outputs::publish(&values)?,
        None => None,
    };
    if let Some(path) = &written {
        info!(path = %path.display(), "step outputs written");
    }

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome, &options);
    }

    Ok(())
}

fn print_outcome(outcome: &ReconcileOutcome, options: &ReconcileOptions) {
    match outcome {
        ReconcileOutcome::NoCommits => {
            println!(
                "{} No commits on {}; nothing to release",
                "○".yellow(),
                options.release_branch.cyan()
            );
        }
        ReconcileOutcome::UpToDate { tag, sha } => {
            println!(
                "{} {} already points at the head of {} ({})",
                "✓".green(),
                tag.name.bold(),
                options.release_branch.cyan(),
                short_sha(sha).dimmed()
            );
        }
        ReconcileOutcome::NoBumpNeeded { tag, commit_count } => {
            println!(
                "{} {} commit{} since {}, none warrant a release",
                "○".yellow(),
                commit_count,
                if *commit_count == 1 { "" } else { "s" },
                tag.name.bold()
            );
        }
        ReconcileOutcome::DryRun(plan) => {
            print_plan(plan);
            println!();
            print!("{}", plan.notes);
            if !plan.notes.ends_with('\n') {
                println!();
            }
        }
        ReconcileOutcome::Released {
            plan,
            release,
            updated,
            deleted,
        } => {
            print_plan(plan);
            println!(
                "{} {} draft {}",
                "✓".green().bold(),
                if *updated { "Updated" } else { "Created" },
                release.tag_name.green().bold()
            );
            if !deleted.is_empty() {
                println!(
                    "  {}: {}",
                    "Deleted stale drafts".dimmed(),
                    deleted
                        .iter()
                        .map(u64::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            if let Some(values) = outcome.outputs() {
                print!("{}", outputs::format_outputs(&values));
            }
        }
    }
}

fn print_plan(plan: &ReleasePlan) {
    let previous = plan
        .previous
        .as_ref()
        .map_or_else(|| "none".to_string(), |t| t.name.clone());
    let bump = plan
        .bump
        .map_or_else(|| "initial".to_string(), |b| b.to_string());
    println!(
        "{}: {} → {} ({}, {} commit{})",
        "Release".bold(),
        previous.dimmed(),
        plan.tag_name.green().bold(),
        bump,
        plan.commit_count,
        if plan.commit_count == 1 { "" } else { "s" }
    );
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sha_truncates() {
        assert_eq!(short_sha("0123456789abcdef"), "0123456");
        assert_eq!(short_sha("abc"), "abc");
    }

    #[test]
    fn missing_repository_fails_before_any_request() {
        let args = ReleaseArgs {
            run: RunArgs {
                repo: Some("nope".into()),
                ..RunArgs::default()
            },
            ..ReleaseArgs::default()
        };
        let err = cmd_release(args, true, true, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
