#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const UNPATCHED: &str = "name: ci\non: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      # fetch sources\n      - uses: actions/checkout@v4\n      - run: make\n";

const PATCHED: &str = "name: ci\non: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      # fetch sources\n      - uses: actions/checkout@v4\n        with:\n          persist-credentials: false\n      - run: make\n";

fn dpc(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("disable-checkout-persist-credentials").unwrap();
    cmd.current_dir(dir.path())
        .env("DPC_ROOT", dir.path())
        .env_remove("DPC_LOG_LEVEL")
        .env_remove("RUST_LOG");
    cmd
}

fn write_workflow(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let wf = dir.path().join(".github/workflows");
    std::fs::create_dir_all(&wf).unwrap();
    let path = wf.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// ---------------------------------------------------------------------------
// discovery
// ---------------------------------------------------------------------------

#[test]
fn discovers_and_patches_workflows() {
    let dir = TempDir::new().unwrap();
    let ci = write_workflow(&dir, "ci.yml", UNPATCHED);
    let release = write_workflow(&dir, "release.yaml", UNPATCHED);

    dpc(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("updated:"))
        .stdout(predicate::str::contains("[workflow] (jobs: build)"))
        .stdout(predicate::str::contains("2 of 2 file(s)"));

    assert_eq!(std::fs::read_to_string(&ci).unwrap(), PATCHED);
    assert_eq!(std::fs::read_to_string(&release).unwrap(), PATCHED);
}

#[test]
fn no_workflows_is_success() {
    let dir = TempDir::new().unwrap();
    dpc(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 of 0 file(s)"));
}

#[test]
fn second_run_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let ci = write_workflow(&dir, "ci.yml", UNPATCHED);
    dpc(&dir).assert().success();
    dpc(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 of 1 file(s)"));
    assert_eq!(std::fs::read_to_string(&ci).unwrap(), PATCHED);
}

// ---------------------------------------------------------------------------
// explicit files
// ---------------------------------------------------------------------------

#[test]
fn explicit_files_skip_discovery() {
    let dir = TempDir::new().unwrap();
    let discovered = write_workflow(&dir, "ci.yml", UNPATCHED);
    let action = dir.path().join("action.yml");
    std::fs::write(
        &action,
        "runs:\n  using: composite\n  steps:\n    - uses: actions/checkout@v4\n      with:\n        persist-credentials: true\n",
    )
    .unwrap();

    dpc(&dir).arg("action.yml").assert().success();

    assert_eq!(
        std::fs::read_to_string(&action).unwrap(),
        "runs:\n  using: composite\n  steps:\n    - uses: actions/checkout@v4\n      with:\n        persist-credentials: false\n"
    );
    assert_eq!(std::fs::read_to_string(&discovered).unwrap(), UNPATCHED);
}

#[test]
fn missing_file_fails_with_path() {
    let dir = TempDir::new().unwrap();
    dpc(&dir)
        .arg("nope.yml")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: nope.yml"));
}

// ---------------------------------------------------------------------------
// errors
// ---------------------------------------------------------------------------

#[test]
fn type_error_aborts_before_any_write() {
    let dir = TempDir::new().unwrap();
    let good = write_workflow(&dir, "a.yml", UNPATCHED);
    write_workflow(
        &dir,
        "b.yml",
        "jobs:\n  deploy:\n    steps:\n      - uses: actions/checkout@v4\n        with:\n          persist-credentials: 1\n",
    );

    dpc(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("b.yml: job 'deploy': persist-credentials must be a string or boolean"));

    assert_eq!(std::fs::read_to_string(&good).unwrap(), UNPATCHED);
}

#[test]
fn invalid_yaml_fails() {
    let dir = TempDir::new().unwrap();
    write_workflow(&dir, "broken.yml", "jobs: [\n");
    dpc(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse YAML"));
}

// ---------------------------------------------------------------------------
// flags
// ---------------------------------------------------------------------------

#[test]
fn dry_run_reports_without_writing() {
    let dir = TempDir::new().unwrap();
    let ci = write_workflow(&dir, "ci.yml", UNPATCHED);
    dpc(&dir)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("would_update:"));
    assert_eq!(std::fs::read_to_string(&ci).unwrap(), UNPATCHED);
}

#[test]
fn json_output_lists_reports() {
    let dir = TempDir::new().unwrap();
    write_workflow(&dir, "ci.yml", UNPATCHED);
    let output = dpc(&dir)
        .args(["--json", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let first = &reports[0];
    assert_eq!(first["status"], "would_update");
    assert_eq!(first["kind"], "workflow");
    assert_eq!(first["jobs"][0], "build");
}

#[test]
fn version_flags() {
    let dir = TempDir::new().unwrap();
    for flag in ["-v", "--version"] {
        dpc(&dir)
            .arg(flag)
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

#[test]
fn debug_logs_go_to_stderr() {
    let dir = TempDir::new().unwrap();
    write_workflow(&dir, "ci.yml", PATCHED);
    dpc(&dir)
        .args(["--log-level", "debug"])
        .assert()
        .success()
        .stderr(predicate::str::contains("already compliant"))
        .stdout(predicate::str::contains("already compliant").not());
}

#[test]
fn invalid_log_level_is_rejected() {
    let dir = TempDir::new().unwrap();
    dpc(&dir).args(["--log-level", "loud"]).assert().failure();
}
