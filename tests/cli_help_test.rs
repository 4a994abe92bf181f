// CLI behaviour through the compiled binary
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ci_migrator(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ci-migrator").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env("CI_MIGRATOR__OBSERVABILITY__JSON_LOGS", "false")
        .env("CI_MIGRATOR__WORKFLOW__WORKSPACE_ROOT", dir.path().join("workspace"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();

    ci_migrator(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("resume"))
        .stdout(predicate::str::contains("show"));
}

#[test]
fn test_invalid_url_fails_without_cloning() {
    let dir = TempDir::new().unwrap();

    ci_migrator(&dir)
        .args(["run", "not-a-url", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"status\": \"error\""))
        .stdout(predicate::str::contains("InvalidURL: "))
        .stderr(predicate::str::contains("failed"));

    assert!(!dir.path().join("workspace").exists());
    let runs: Vec<_> = std::fs::read_dir(dir.path().join(".ci-migrator/runs"))
        .unwrap()
        .collect();
    assert_eq!(runs.len(), 1);
}

#[test]
fn test_failed_run_can_be_shown() {
    let dir = TempDir::new().unwrap();
    ci_migrator(&dir)
        .args(["run", "ftp://example.com/org/repo.git"])
        .assert()
        .failure();

    let run_file = std::fs::read_dir(dir.path().join(".ci-migrator/runs"))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let run_id = run_file.file_stem().unwrap().to_string_lossy().to_string();

    ci_migrator(&dir)
        .args(["show", &run_id, "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"error\""))
        .stdout(predicate::str::contains("Invalid URL scheme 'ftp'"));

    ci_migrator(&dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&run_id));
}

#[test]
fn test_resume_requires_a_decision() {
    let dir = TempDir::new().unwrap();

    ci_migrator(&dir)
        .args(["resume", "some-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--approve"));
}

#[test]
fn test_resume_of_unknown_run_fails() {
    let dir = TempDir::new().unwrap();

    ci_migrator(&dir)
        .args(["resume", "missing-run", "--approve"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No persisted run with id missing-run"));

    assert!(!dir.path().join(".ci-migrator/runs/missing-run.lock").exists());
}

#[test]
fn test_resume_of_finished_run_is_refused() {
    let dir = TempDir::new().unwrap();
    ci_migrator(&dir)
        .args(["run", "not-a-url"])
        .assert()
        .failure();
    let run_file = std::fs::read_dir(dir.path().join(".ci-migrator/runs"))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let run_id = run_file.file_stem().unwrap().to_string_lossy().to_string();

    ci_migrator(&dir)
        .args(["resume", &run_id, "--reject", "too late"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only runs awaiting approval can be resumed"));

    let lock_files: Vec<_> = std::fs::read_dir(dir.path().join(".ci-migrator/runs"))
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "lock"))
        .collect();
    assert!(lock_files.is_empty());
}

#[test]
fn test_list_without_runs() {
    let dir = TempDir::new().unwrap();

    ci_migrator(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No migration runs found"));
}
