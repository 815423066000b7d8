//! Command-line surface tests

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn reelcut(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("reelcut").unwrap();
    cmd.current_dir(workdir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let workdir = TempDir::new().unwrap();
    reelcut(&workdir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("hardware"))
        .stdout(predicate::str::contains("peaks"))
        .stdout(predicate::str::contains("sweep"));
}

#[test]
fn test_render_missing_input_fails() {
    let workdir = TempDir::new().unwrap();
    reelcut(&workdir)
        .args(["render", "--input", "missing.mp4", "--start", "0", "--end", "10"])
        .args(["--progress", "silent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_render_rejects_bad_time() {
    let workdir = TempDir::new().unwrap();
    reelcut(&workdir)
        .args(["render", "--input", "talk.mp4", "--start", "1:75", "--end", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid start time"));
}

#[test]
fn test_bad_config_is_reported() {
    let workdir = TempDir::new().unwrap();
    std::fs::write(workdir.path().join("reelcut.toml"), "[render]\nfps = \"fast\"\n").unwrap();
    reelcut(&workdir)
        .args(["sweep"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_sweep_reports_counts() {
    let workdir = TempDir::new().unwrap();
    std::fs::create_dir(workdir.path().join("temp")).unwrap();
    std::fs::write(workdir.path().join("temp").join("fresh.wav"), b"").unwrap();
    reelcut(&workdir)
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 0 file(s), 0 failure(s)"));
    assert!(workdir.path().join("temp").join("fresh.wav").is_file());
}
