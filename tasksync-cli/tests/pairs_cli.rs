use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use tasksync_core::config::load_at;
use tasksync_core::types::{Direction, ReconcileMode};
use tempfile::TempDir;

fn tasksync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tasksync"));
    cmd.env("HOME", home).env("USERPROFILE", home);
    cmd
}

fn add(home: &Path, a: &str, b: &str, extra: &[&str]) -> assert_cmd::assert::Assert {
    tasksync_cmd(home)
        .args(["pairs", "add", "--a", a, "--b", b])
        .args(extra)
        .assert()
}

#[test]
fn list_without_config_suggests_add() {
    let home = TempDir::new().expect("home");
    tasksync_cmd(home.path())
        .args(["pairs", "list"])
        .assert()
        .success()
        .stdout(contains("No pairs configured."));
}

#[test]
fn add_writes_default_config_and_list_shows_it() {
    let home = TempDir::new().expect("home");

    add(home.path(), "Acme/Roadmap", "Acme Partners/Roadmap", &[])
        .success()
        .stdout(contains("Added Acme/Roadmap <-> Acme Partners/Roadmap"));

    let config = load_at(home.path()).expect("config written under HOME");
    assert_eq!(config.pairs.len(), 1);

    tasksync_cmd(home.path())
        .args(["pairs", "list"])
        .assert()
        .success()
        .stdout(contains("Acme Partners/Roadmap"))
        .stdout(contains("first_missing_only"));
}

#[test]
fn add_flags_set_one_way_create_only() {
    let home = TempDir::new().expect("home");

    add(
        home.path(),
        "Acme/Roadmap",
        "Acme Partners/Roadmap",
        &["--one-way", "--create-only"],
    )
    .success()
    .stdout(contains("Acme/Roadmap -> Acme Partners/Roadmap"));

    let pair = &load_at(home.path()).expect("config").pairs[0];
    assert_eq!(pair.direction, Direction::AToB);
    assert_eq!(pair.mode, ReconcileMode::CreateOnly);
}

#[test]
fn adding_the_same_pair_twice_is_a_no_op() {
    let home = TempDir::new().expect("home");
    add(home.path(), "Acme/Roadmap", "Acme Partners/Roadmap", &[]).success();

    add(home.path(), "Acme/Roadmap", "Acme Partners/Roadmap", &[])
        .success()
        .stdout(contains("already configured"));
    assert_eq!(load_at(home.path()).expect("config").pairs.len(), 1);
}

#[test]
fn malformed_collection_argument_is_rejected() {
    let home = TempDir::new().expect("home");
    add(home.path(), "Roadmap", "Acme Partners/Roadmap", &[])
        .failure()
        .stderr(contains("expected WORKSPACE/COLLECTION"));
}

#[test]
fn identical_endpoints_are_rejected() {
    let home = TempDir::new().expect("home");
    add(home.path(), "Acme/Roadmap", "Acme/Roadmap", &[])
        .failure()
        .stderr(contains("both sides"));
}

#[test]
fn explicit_config_path_is_honored() {
    let home = TempDir::new().expect("home");
    let path = home.path().join("custom").join("pairs.yaml");

    add(
        home.path(),
        "Acme/Roadmap",
        "Acme Partners/Roadmap",
        &["--config", path.to_str().expect("utf-8 path")],
    )
    .success();

    assert!(path.exists());
    assert!(!home.path().join(".tasksync").exists());
}
