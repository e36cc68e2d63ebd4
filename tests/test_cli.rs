use assert_cmd::prelude::*;
#[allow(unused_imports)]
use predicates::prelude::*;

use std::process::Command;

#[test]
fn test_cli() {
    let mut cmd = Command::cargo_bin("csubatch").expect("Calling binary failed");
    cmd.assert().failure();
}

#[test]
fn test_version() {
    let expected_version = "csubatch 0.1.0\n";
    let mut cmd = Command::cargo_bin("csubatch").expect("Calling binary failed");
    cmd.arg("--version").assert().stdout(expected_version);
}

#[test]
fn test_subcommand_version() {
    let expected = "argument '--version' which wasn't expected";

    let mut cmd = Command::cargo_bin("csubatch").expect("Calling binary failed");
    cmd.arg("config")
        .arg("--version")
        .assert()
        .stderr(predicate::str::contains(expected));
}

#[test]
fn test_config_dump() {
    let mut cmd = Command::cargo_bin("csubatch").expect("Calling binary failed");
    cmd.arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("collection_window_ms"));
}

#[test]
fn test_unknown_preset() {
    let mut cmd = Command::cargo_bin("csubatch").expect("Calling binary failed");
    cmd.args(&["--preset", "nope", "config"]).assert().failure();
}

#[test]
fn test_perf() {
    let mut cmd = Command::cargo_bin("csubatch").expect("Calling binary failed");
    cmd.args(&[
        "--preset", "quick", "perf", "--jobs", "3", "--policy", "sjf", "--min-cpu", "0.01", "--max-cpu",
        "0.02", "--seed", "cli",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Throughput"))
    .stdout(predicate::str::contains("Seed: cli"));
}

#[test]
fn test_perf_rejects_bad_range() {
    let mut cmd = Command::cargo_bin("csubatch").expect("Calling binary failed");
    cmd.args(&["perf", "--min-cpu", "2", "--max-cpu", "1"])
        .assert()
        .failure();
}

#[test]
fn test_shell() {
    let mut cmd = assert_cmd::Command::cargo_bin("csubatch").expect("Calling binary failed");
    cmd.args(&["--preset", "quick", "shell"])
        .write_stdin("run a 0.01 1\nlist\npolicy_change sjf\npolicy_change lottery\nhelp\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Job a was submitted."))
        .stdout(predicate::str::contains("Scheduling policy is switched to SJF"))
        .stdout(predicate::str::contains("unsupported scheduling policy"))
        .stdout(predicate::str::contains("Total number of jobs completed"));
}
