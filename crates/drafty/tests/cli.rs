//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Returns a Command configured to run our binary, isolated from any
/// GitHub Actions environment the tests happen to run under.
#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env_remove("GITHUB_REPOSITORY")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("release"))
        .stdout(predicate::str::contains("notes"));
}

#[test]
fn long_help_lists_environment() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("GITHUB_OUTPUT"))
        .stdout(predicate::str::contains("DRAFTY_LOG_DIR"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn release_help_shows_flags() {
    cmd()
        .args(["release", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--tag-prefix"))
        .stdout(predicate::str::contains("--branch"))
        .stdout(predicate::str::contains("--initial-version"))
        .stdout(predicate::str::contains("--template"))
        .stdout(predicate::str::contains("--repo"))
        .stdout(predicate::str::contains("--token"));
}

#[test]
fn notes_help_has_no_dry_run_flag() {
    cmd()
        .args(["notes", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--template"))
        .stdout(predicate::str::contains("--dry-run").not());
}

// =============================================================================
// Info Command
// =============================================================================

#[test]
fn info_shows_package_name_and_version() {
    cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_NAME")))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn info_json_outputs_valid_json() {
    let output = cmd().args(["info", "--json"]).assert().success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("info --json should output valid JSON");

    assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["config"]["release"]["initial_version"], "0.1.0");
}

// =============================================================================
// Doctor Command
// =============================================================================

#[test]
fn doctor_json_reports_missing_token() {
    let tmp = TempDir::new().unwrap();
    let output = cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["github"]["token"], false);
    assert_eq!(json["config"]["found"], false);
}

// =============================================================================
// Global Flags
// =============================================================================

#[test]
fn quiet_and_verbose_flags_accepted() {
    let cases: [&[&str]; 5] = [&["-q"], &["--quiet"], &["-v"], &["-vv"], &["--verbose"]];
    for flags in cases {
        cmd().args(flags).arg("info").assert().success();
    }
}

#[test]
fn color_choices_accepted() {
    for choice in ["auto", "always", "never"] {
        cmd().args(["--color", choice, "info"]).assert().success();
    }
}

#[test]
fn logs_go_to_stderr_not_stdout() {
    let output = cmd().args(["-vv", "info", "--json"]).assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    serde_json::from_str::<serde_json::Value>(&stdout).expect("stdout is only JSON");
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn invalid_subcommand_shows_error() {
    cmd()
        .arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn malformed_repo_flag_fails() {
    cmd()
        .args(["release", "--repo", "widgets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid repository"));
}

#[test]
fn release_without_repository_fails() {
    let tmp = TempDir::new().unwrap();
    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "release", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not determine the repository"));
}

#[test]
fn missing_template_file_fails() {
    cmd()
        .args([
            "notes",
            "--repo",
            "octo/widgets",
            "--template",
            "/nonexistent/notes.hbs",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read template"));
}

#[test]
fn unreachable_api_fails_without_outputs() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("output");
    std::fs::write(
        tmp.path().join(".drafty.toml"),
        "[github]\nrepository = \"octo/widgets\"\napi_url = \"http://127.0.0.1:9\"\n",
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "release"])
        .env("GITHUB_OUTPUT", &out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("release run for octo/widgets failed"));
    assert!(!out.exists());
}

// =============================================================================
// Chdir Flag
// =============================================================================

#[test]
fn chdir_flag_changes_directory() {
    cmd().args(["-C", "/tmp", "info"]).assert().success();
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "info"])
        .assert()
        .failure();
}
