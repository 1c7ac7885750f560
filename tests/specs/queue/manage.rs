//! Queue management specs

use crate::prelude::*;
use predicates::str::contains;

#[test]
fn queue_init_creates_the_table() {
    let project = Project::with_defaults();

    project
        .evoq()
        .args(["queue", "init"])
        .assert()
        .success()
        .stdout(contains("Initialized"));

    assert!(project.store_text().starts_with(STORE_HEADER));
}

#[test]
fn queue_add_and_list_round_trip() {
    let project = Project::with_defaults();

    project
        .evoq()
        .args(["queue", "add", "gen00-000", "baseline seed"])
        .assert()
        .success();
    project
        .evoq()
        .args([
            "queue",
            "add",
            "gen01-001",
            "unroll the inner loop",
            "--parent",
            "gen00-000",
        ])
        .assert()
        .success();

    project
        .evoq()
        .args(["queue", "list"])
        .assert()
        .success()
        .stdout(contains("gen00-000"))
        .stdout(contains("gen01-001"))
        .stdout(contains("unroll the inner loop"));

    project
        .evoq()
        .args(["queue", "status"])
        .assert()
        .success()
        .stdout(contains("pending:     2"));
}

#[test]
fn queue_add_rejects_duplicate_ids() {
    let project = Project::with_defaults();

    project
        .evoq()
        .args(["queue", "add", "gen00-000", "first"])
        .assert()
        .success();
    project
        .evoq()
        .args(["queue", "add", "gen00-000", "second"])
        .assert()
        .failure()
        .stderr(contains("duplicate job id"));
}

#[test]
fn queue_requeue_rejects_non_terminal_jobs() {
    let project = Project::with_defaults();
    project.store_with(&["gen01-001,,try it,,pending"]);

    project
        .evoq()
        .args(["queue", "requeue", "gen01-001"])
        .assert()
        .failure()
        .stderr(contains("not terminal"));
}

#[test]
fn queue_requeue_revives_a_failed_job() {
    let project = Project::with_defaults();
    project.store_with(&["gen01-001,,try it,,failed"]);

    project
        .evoq()
        .args(["queue", "requeue", "gen01-001"])
        .assert()
        .success()
        .stdout(contains("Requeued gen01-001"));

    assert!(project.store_text().contains("pending"));
}

#[test]
fn commands_fail_without_a_config() {
    let project = Project::empty();

    project
        .evoq()
        .args(["queue", "list"])
        .assert()
        .failure()
        .stderr(contains("config not found"));
}

#[test]
fn malformed_rows_do_not_break_listing() {
    let project = Project::with_defaults();
    project.store_with(&[
        "gen01-001,,fine,,pending",
        "gen01-002,,broken,-,what-status",
    ]);

    project
        .evoq()
        .args(["queue", "list"])
        .assert()
        .success()
        .stdout(contains("gen01-001"));
}
