//! CLI surface tests. The list mode needs neither a gateway nor a launcher.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn list_prints_the_catalog_and_exits_zero() {
    Command::cargo_bin("ringtest")
        .unwrap()
        .args(["localhost:15000", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ring_small"))
        .stdout(predicate::str::contains("rolling_restart"))
        .stdout(predicate::str::contains("get_stream"));
}

#[test]
fn list_is_lexicographically_ordered() {
    let output = Command::cargo_bin("ringtest")
        .unwrap()
        .args(["localhost:15000", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(!names.is_empty());
}

#[test]
fn missing_host_is_a_usage_error() {
    Command::cargo_bin("ringtest")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
