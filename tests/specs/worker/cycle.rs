//! Single worker cycle specs: claim, mutate, evaluate, persist

use crate::prelude::*;
use predicates::str::contains;

fn seeded_queue(project: &Project) {
    project.store_with(&[
        "gen00-000,,baseline,1.0,complete",
        "gen01-001,gen00-000,improve the loop,,pending",
    ]);
}

#[test]
fn worker_completes_a_job_with_a_json_score() {
    let project = Project::empty();
    project.file("seed.py", "def solve():\n    return 1\n");
    project.config(&default_config(r#"echo '{\"score\": 1.25}'"#));
    seeded_queue(&project);

    project
        .evoq()
        .args(["worker"])
        .assert()
        .success()
        .stdout(contains("gen01-001 -> complete"));

    let store = project.store_text();
    assert!(store.contains("gen01-001,gen00-000,improve the loop,1.25,complete"));

    // The artifact exists and differs from the seed
    let artifact = std::fs::read_to_string(project.path().join("artifacts/gen01-001.py")).unwrap();
    assert!(artifact.contains("# mutated"));
}

#[test]
fn worker_accepts_a_bare_number_score() {
    let project = Project::with_defaults();
    seeded_queue(&project);

    project.evoq().args(["worker"]).assert().success();
    assert!(project.store_text().contains("1.25,complete"));
}

#[test]
fn worker_is_idle_on_an_empty_queue() {
    let project = Project::with_defaults();
    project.store_with(&[]);

    project.evoq().args(["worker"]).assert().success();
}

#[test]
fn zero_score_fails_the_job_but_records_the_zero() {
    let project = Project::with_defaults();
    project.config(&default_config("echo 0"));
    seeded_queue(&project);

    project.evoq().args(["worker"]).assert().code(1);

    let store = project.store_text();
    assert!(store.contains("gen01-001,gen00-000,improve the loop,0,failed-retry1"));
}

#[test]
fn zero_score_is_terminal_with_retries_disabled() {
    let project = Project::with_defaults();
    project.config(&format!(
        "{}\n[retry]\nmax_retries = 0\n",
        default_config("echo 0")
    ));
    seeded_queue(&project);

    project.evoq().args(["worker"]).assert().code(1);
    assert!(project.store_text().contains(",0,failed"));
}

#[test]
fn zero_score_completes_when_the_flag_is_off() {
    let project = Project::with_defaults();
    project.config(&format!(
        "{}\n[scoring]\nzero_is_failure = false\n",
        default_config("echo 0")
    ));
    seeded_queue(&project);

    project.evoq().args(["worker"]).assert().success();
    assert!(project.store_text().contains(",0,complete"));
}

#[test]
fn evaluation_deadline_yields_timeout_not_failure() {
    let project = Project::with_defaults();
    project.config(&format!(
        r#"{}timeout = "1s""#,
        default_config("sleep 5; echo 1.0")
    ));
    seeded_queue(&project);

    let start = std::time::Instant::now();
    project.evoq().args(["worker"]).assert().code(1);

    assert!(project.store_text().contains("timeout"));
    assert!(
        start.elapsed() < std::time::Duration::from_secs(4),
        "evaluator group was killed at the deadline"
    );
}

#[test]
fn noop_mutation_is_not_recorded_as_progress() {
    let project = Project::with_defaults();
    // The agent exits successfully but never touches the artifact
    project.config(
        r#"
[queue]
store = "jobs.csv"
artifacts = "artifacts"
seed = "seed.py"

[[provider.mutate]]
name = "liar"
run = "echo did the work"

[evaluator]
run = "echo 1.25"
"#,
    );
    seeded_queue(&project);

    project.evoq().args(["worker"]).assert().code(1);
    assert!(project.store_text().contains("failed-retry1"));
}

#[test]
fn quota_signature_requeues_and_exits_fatal() {
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
    seeded_queue(&project);

    project.evoq().args(["worker"]).assert().code(3);

    // Requeued without penalty
    assert!(project.store_text().contains("improve the loop,,pending"));
}

#[test]
fn worker_runs_an_explicit_job_id() {
    let project = Project::with_defaults();
    project.store_with(&[
        "gen00-000,,baseline,1.0,complete",
        "gen01-001,gen00-000,older job,,pending",
        "gen01-002,gen00-000,newer job,,pending",
    ]);

    project
        .evoq()
        .args(["worker", "--id", "gen01-002"])
        .assert()
        .success()
        .stdout(contains("gen01-002 -> complete"));

    // The older job is untouched
    assert!(project.store_text().contains("older job,,pending"));
}

#[test]
fn missing_parent_artifact_fails_without_retry() {
    let project = Project::with_defaults();
    project.store_with(&[
        "gen00-000,,baseline,1.0,complete",
        "gen01-001,gen00-000,made it,1.1,complete",
        "gen02-001,gen01-001,descend,,pending",
    ]);
    // gen01-001 is complete but its artifact was deleted

    project.evoq().args(["worker"]).assert().code(1);
    assert!(project.store_text().contains("descend,,failed"));
}
