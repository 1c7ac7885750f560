//! Crash and interrupt recovery specs

use crate::prelude::*;
use predicates::str::contains;

#[test]
fn stale_running_jobs_requeue_exactly_once() {
    let project = Project::with_defaults();
    // A worker died mid-job in a previous run
    project.store_with(&[
        "gen00-000,,baseline,1.0,complete",
        "gen01-001,gen00-000,left behind,,running",
    ]);

    project
        .evoq()
        .args(["queue", "reset"])
        .assert()
        .success()
        .stdout(contains("Requeued 1"));

    let store = project.store_text();
    assert!(store.contains("left behind,,pending"));
    assert_eq!(store.matches("gen01-001").count(), 1, "not duplicated");

    // Idempotent: a second scan finds nothing stale
    project
        .evoq()
        .args(["queue", "reset"])
        .assert()
        .success()
        .stdout(contains("Requeued 0"));
}

#[test]
fn interrupted_worker_resolves_the_job_before_exiting() {
    let project = Project::with_defaults();
    // Hold the worker inside a long evaluation
    project.config(&default_config("sleep 30; echo 1.0"));
    project.store_with(&[
        "gen00-000,,baseline,1.0,complete",
        "gen01-001,gen00-000,slow one,,pending",
    ]);

    let mut child = std::process::Command::new(Project::bin())
        .args(["worker"])
        .current_dir(project.path())
        .env("EVOQ_LOG", "warn")
        .spawn()
        .unwrap();

    // Wait until the job is claimed and evaluation is underway
    assert!(
        wait_for(5000, || project.store_text().contains("running")),
        "worker should claim the job"
    );

    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(child.id() as i32),
        nix::sys::signal::Signal::SIGTERM,
    )
    .unwrap();

    let status = child.wait().unwrap();
    assert!(!status.success());

    // Never left running: the interrupt was persisted
    assert!(
        wait_for(2000, || project.store_text().contains("interrupted")),
        "job should be resolved to interrupted"
    );
}
