//! Dispatcher run specs

use crate::prelude::*;
use predicates::str::contains;

#[test]
fn run_drains_the_queue_and_reports() {
    let project = Project::with_defaults();
    project.store_with(&[
        "gen00-000,,baseline,1.0,complete",
        "gen01-001,gen00-000,variant a,,pending",
        "gen01-002,gen00-000,variant b,,pending",
        "gen01-003,gen00-000,variant c,,pending",
    ]);

    project
        .evoq()
        .args(["run"])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .success()
        .stdout(contains("3 completed"));

    let store = project.store_text();
    assert_eq!(store.matches(",complete").count(), 4);
    assert!(!store.contains("pending"));
}

#[test]
fn run_respects_the_concurrency_flag() {
    let project = Project::with_defaults();
    project.store_with(&[
        "gen00-000,,baseline,1.0,complete",
        "gen01-001,gen00-000,variant a,,pending",
        "gen01-002,gen00-000,variant b,,pending",
    ]);

    project
        .evoq()
        .args(["run", "--concurrency", "1"])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .success()
        .stdout(contains("2 completed"));
}

#[test]
fn run_terminates_cleanly_on_an_empty_queue() {
    let project = Project::with_defaults();

    project
        .evoq()
        .args(["run"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(contains("0 completed"));
}

#[test]
fn run_requires_the_seed_to_exist() {
    let project = Project::with_defaults();
    std::fs::remove_file(project.path().join("seed.py")).unwrap();

    project
        .evoq()
        .args(["run"])
        .assert()
        .failure()
        .stderr(contains("seed not found"));
}

#[test]
fn replenisher_refills_an_empty_queue() {
    let project = Project::with_defaults();
    // Idempotent: a second invocation (queue empty again) adds nothing
    project.file(
        "replenish.sh",
        "grep -q gen01-001 jobs.csv || printf 'gen01-001,,try a,,\\ngen01-002,,try b,,\\n' >> jobs.csv\n",
    );
    project.config(&format!(
        "{}\n[replenisher]\nrun = \"sh replenish.sh\"\n",
        default_config("echo 1.25")
    ));

    project
        .evoq()
        .args(["run"])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .success()
        .stdout(contains("2 completed"));

    let store = project.store_text();
    assert!(store.contains("try a"));
    assert!(store.contains("try b"));
    assert!(!store.contains("pending"));
}

#[test]
fn quota_exhaustion_halts_the_whole_run() {
    let project = Project::with_defaults();
    project.config(
        r#"
[queue]
store = "jobs.csv"
artifacts = "artifacts"
seed = "seed.py"

[[provider.mutate]]
name = "limited"
run = "echo 'rate limit exceeded' >&2; exit 1"

[evaluator]
run = "echo 1.25"
"#,
    );
    project.store_with(&[
        "gen00-000,,baseline,1.0,complete",
        "gen01-001,gen00-000,variant a,,pending",
        "gen01-002,gen00-000,variant b,,pending",
    ]);

    project
        .evoq()
        .args(["run"])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .failure()
        .stderr(contains("quota exhausted"));

    // Jobs were requeued, not burned
    assert!(project.store_text().contains("pending"));
}

#[test]
fn interrupt_drains_gracefully_and_leaves_recoverable_state() {
    let project = Project::with_defaults();
    // Workers stall inside a long evaluation
    project.config(&default_config("sleep 30; echo 1.0"));
    project.store_with(&[
        "gen00-000,,baseline,1.0,complete",
        "gen01-001,gen00-000,slow one,,pending",
    ]);

    let mut child = std::process::Command::new(Project::bin())
        .args(["run"])
        .current_dir(project.path())
        .env("EVOQ_LOG", "warn")
        .spawn()
        .unwrap();

    assert!(
        wait_for(10_000, || project.store_text().contains("running")),
        "a worker should claim the job"
    );

    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(child.id() as i32),
        nix::sys::signal::Signal::SIGINT,
    )
    .unwrap();

    // The dispatcher terminates workers, which resolve their jobs
    let finished = wait_for(15_000, || {
        child.try_wait().ok().flatten().is_some()
    });
    assert!(finished, "run should exit within the grace period");

    let store = project.store_text();
    assert!(
        store.contains("interrupted") || store.contains("pending"),
        "job left recoverable, never stuck running: {store}"
    );
}
