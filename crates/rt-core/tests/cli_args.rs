//! CLI argument and exit-code contract tests.

use assert_cmd::Command;
use predicates::prelude::*;

fn rt() -> Command {
    Command::cargo_bin("rt").expect("rt binary builds")
}

#[test]
fn test_help_names_the_tool() {
    rt().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Relay Triage"))
        .stdout(predicate::str::contains("--source-url"))
        .stdout(predicate::str::contains("--no-cache"));
}

#[test]
fn test_version_flag() {
    rt().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rt"));
}

#[test]
fn test_no_source_is_args_error() {
    rt().arg("--no-cache").assert().code(10);
}

#[test]
fn test_missing_input_file_is_no_session_data() {
    rt().args(["--no-cache", "/nonexistent/socks.txt"])
        .assert()
        .code(15)
        .stderr(predicate::str::contains("socks.txt"));
}

#[test]
fn test_missing_config_file_is_args_error() {
    let tmp = tempfile::TempDir::new().unwrap();
    let socks = tmp.path().join("socks.txt");
    std::fs::write(&socks, "SMB 10.0.0.5 CORP/alice TRUE\n").unwrap();

    rt().args(["--no-cache", "--config", "/nonexistent/config.toml"])
        .arg(&socks)
        .assert()
        .code(10);
}

#[test]
fn test_conflicting_verbosity_flags_rejected() {
    rt().args(["-v", "-q", "/tmp/socks.txt"]).assert().code(2);
}

#[test]
fn test_quit_run_prints_summary_and_exits_clean() {
    let tmp = tempfile::TempDir::new().unwrap();
    let socks = tmp.path().join("socks.txt");
    std::fs::write(
        &socks,
        "SMB 10.0.0.5 CORP/alice TRUE\n\
         SMB 10.0.0.6 CORP/bob FALSE\n\
         SMB 10.0.0.7 CORP/carol TRUE\n",
    )
    .unwrap();

    rt().arg("--no-cache")
        .arg(&socks)
        .write_stdin("q\n")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Number of unique systems: 2"))
        .stdout(predicate::str::contains("Main Menu"));
}

#[test]
fn test_eof_on_stdin_exits_clean() {
    let tmp = tempfile::TempDir::new().unwrap();
    let socks = tmp.path().join("socks.txt");
    std::fs::write(&socks, "SMB 10.0.0.5 CORP/alice TRUE\n").unwrap();

    rt().arg("--no-cache")
        .arg(&socks)
        .write_stdin("")
        .assert()
        .code(0);
}

#[test]
fn test_cache_flag_creates_log_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let socks = tmp.path().join("socks.txt");
    std::fs::write(&socks, "SMB 10.0.0.5 CORP/alice TRUE\n").unwrap();
    let cache = tmp.path().join("state").join("cache.txt");

    rt().arg("--cache")
        .arg(&cache)
        .arg(&socks)
        .write_stdin("q\n")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Previously cached hosts: 0"));

    assert!(cache.exists());
}

#[test]
fn test_invalid_timeout_override_rejected() {
    let tmp = tempfile::TempDir::new().unwrap();
    let socks = tmp.path().join("socks.txt");
    std::fs::write(&socks, "SMB 10.0.0.5 CORP/alice TRUE\n").unwrap();

    rt().args(["--no-cache", "--timeout", "0"])
        .arg(&socks)
        .assert()
        .code(10);
}
