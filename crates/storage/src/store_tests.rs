use super::*;
use evoq_core::Job;
use std::collections::HashSet;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

fn open_store(dir: &TempDir) -> JobStore {
    let store = JobStore::open(dir.path().join("jobs.csv"), WAIT);
    store.init().unwrap();
    store
}

fn seed_jobs(store: &JobStore, count: usize) {
    let jobs: Vec<Job> = (0..count)
        .map(|i| {
            Job::pending(
                format!("gen01-{:03}", i),
                Some(JobId::new("gen00-000")),
                format!("variant {}", i),
            )
        })
        .collect();
    store.append(&jobs).unwrap();
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.init().unwrap();
    assert_eq!(store.count_pending().unwrap(), 0);
}

#[test]
fn operations_on_missing_store_fail() {
    let dir = TempDir::new().unwrap();
    let store = JobStore::open(dir.path().join("absent.csv"), WAIT);
    assert!(matches!(store.count_pending(), Err(StoreError::Missing(_))));
}

#[test]
fn claim_next_takes_oldest_and_marks_running() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 3);

    let (id, prior) = store.claim_next().unwrap().unwrap();
    assert_eq!(id, JobId::new("gen01-000"));
    assert_eq!(prior, JobStatus::Pending);
    assert_eq!(store.read(&id).unwrap().status, JobStatus::Running);
    assert_eq!(store.count_pending().unwrap(), 2);
}

#[test]
fn claim_next_returns_none_when_drained() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 1);

    assert!(store.claim_next().unwrap().is_some());
    assert!(store.claim_next().unwrap().is_none());
}

#[test]
fn claim_next_reports_retry_prior_status() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 1);

    let id = JobId::new("gen01-000");
    store
        .update_status(&id, JobStatus::FailedRetry(2))
        .unwrap();

    let (claimed, prior) = store.claim_next().unwrap().unwrap();
    assert_eq!(claimed, id);
    assert_eq!(prior, JobStatus::FailedRetry(2));
}

#[test]
fn claim_by_id_rejects_unclaimable() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 1);

    let id = JobId::new("gen01-000");
    store.update_status(&id, JobStatus::Complete).unwrap();
    assert!(matches!(
        store.claim(&id),
        Err(StoreError::NotClaimable { .. })
    ));
}

#[test]
fn resolve_writes_status_and_performance_together() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 1);

    let id = JobId::new("gen01-000");
    store.resolve(&id, JobStatus::Complete, Some(1.25)).unwrap();

    let job = store.read(&id).unwrap();
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.performance, Some(1.25));
}

#[test]
fn append_rejects_duplicate_ids() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 1);

    let dup = Job::pending("gen01-000", None, "dup");
    assert!(matches!(
        store.append(&[dup]),
        Err(StoreError::DuplicateId(_))
    ));
}

#[test]
fn append_rejects_duplicates_within_batch() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let jobs = vec![
        Job::pending("gen01-000", None, "a"),
        Job::pending("gen01-000", None, "b"),
    ];
    assert!(matches!(
        store.append(&jobs),
        Err(StoreError::DuplicateId(_))
    ));
}

#[test]
fn reset_stale_running_requeues_exactly_once() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 2);

    let (id, _) = store.claim_next().unwrap().unwrap();
    assert_eq!(store.count_pending().unwrap(), 1);

    // Simulates a fresh boot after the owning process died
    assert_eq!(store.reset_stale_running().unwrap(), 1);
    assert_eq!(store.count_pending().unwrap(), 2);
    assert_eq!(store.read(&id).unwrap().status, JobStatus::Pending);

    // Idempotent: nothing left to requeue
    assert_eq!(store.reset_stale_running().unwrap(), 0);
    assert_eq!(store.count_pending().unwrap(), 2);
}

#[test]
fn malformed_rows_are_skipped_but_preserved() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 1);

    // Corrupt a line by hand, as a crashed external writer might
    let mut text = std::fs::read_to_string(store.path()).unwrap();
    text.push_str("garbage,,row,,not-a-status\n");
    std::fs::write(store.path(), &text).unwrap();

    // The malformed row is invisible to readers...
    assert_eq!(store.list().unwrap().len(), 1);

    // ...but an unrelated write carries it through verbatim
    store
        .update_status(&JobId::new("gen01-000"), JobStatus::Complete)
        .unwrap();
    let rewritten = std::fs::read_to_string(store.path()).unwrap();
    assert!(rewritten.contains("garbage,,row,,not-a-status"));
}

#[test]
fn duplicate_ids_in_file_surface_distinctly() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    std::fs::write(
        store.path(),
        "id,parent_id,description,performance,status\n\
         gen01-000,,a,,pending\n\
         gen01-000,,b,,pending\n",
    )
    .unwrap();

    assert!(matches!(store.list(), Err(StoreError::DuplicateId(_))));
}

#[test]
fn short_rows_from_external_writers_are_claimable() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    // A replenisher may append id and description only
    let mut text = std::fs::read_to_string(store.path()).unwrap();
    text.push_str("gen05-000,gen04-001,try memoization\n");
    std::fs::write(store.path(), &text).unwrap();

    assert_eq!(store.count_pending().unwrap(), 1);
    let (id, prior) = store.claim_next().unwrap().unwrap();
    assert_eq!(id, JobId::new("gen05-000"));
    assert_eq!(prior, JobStatus::Pending);
}

#[test]
fn lock_timeout_fails_loudly() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 1);

    // Hold the sidecar lock from this thread
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.path().join("jobs.csv.lock"))
        .unwrap();
    fs2::FileExt::try_lock_exclusive(&lock_file).unwrap();

    let impatient = JobStore::open(dir.path().join("jobs.csv"), Duration::from_millis(50));
    assert!(matches!(
        impatient.claim_next(),
        Err(StoreError::LockTimeout { .. })
    ));

    fs2::FileExt::unlock(&lock_file).unwrap();
}

#[test]
fn at_most_one_claim_under_contention() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let total = 24;
    seed_jobs(&store, total);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(std::thread::spawn(move || {
            let mut claimed = Vec::new();
            while let Some((id, _)) = store.claim_next().unwrap() {
                claimed.push(id);
            }
            claimed
        }));
    }

    let mut all: Vec<JobId> = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let unique: HashSet<&JobId> = all.iter().collect();
    assert_eq!(all.len(), total, "every job claimed");
    assert_eq!(unique.len(), total, "no job claimed twice");
    assert_eq!(store.count_pending().unwrap(), 0);
}

#[test]
fn readers_never_observe_torn_rows_during_updates() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_jobs(&store, 4);

    let writer = {
        let store = store.clone();
        std::thread::spawn(move || {
            for round in 0..20 {
                for i in 0..4 {
                    let id = JobId::new(format!("gen01-{:03}", i));
                    store
                        .update_performance(&id, f64::from(round))
                        .unwrap();
                }
            }
        })
    };

    // Concurrent reads must always see a fully-formed table
    for _ in 0..50 {
        let jobs = store.list().unwrap();
        assert_eq!(jobs.len(), 4);
    }

    writer.join().unwrap();
}
