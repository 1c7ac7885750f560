// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-job worker lifecycle
//!
//! One worker process handles one job: claim, resolve the parent
//! artifact, mutate through the provider router, verify the mutation
//! actually changed bytes, evaluate under an optional deadline, classify,
//! persist. The process exit code is the contract with the dispatcher:
//! 0 success, 1 ordinary failure, 2 retryable, 3 fatal quota exhaustion.

use crate::error::EngineError;
use crate::router::{ProviderRouter, RouteError};
use evoq_adapters::{AgentTask, EvalError, Evaluator, Provider};
use evoq_core::{artifact_path_for, JobId, JobStatus, Outcome, RetryPolicy};
use evoq_storage::{JobStore, StoreError};
use std::path::PathBuf;
use tokio::sync::watch;

/// Worker process exit codes, interpreted by the dispatcher
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerExit {
    /// Job completed (or there was nothing to claim)
    Success,
    /// Ordinary failure; counts toward the consecutive-failure budget
    Failure,
    /// Transient infra trouble (e.g. store lock contention); retry later
    Retryable,
    /// Pool-wide quota exhaustion; the dispatcher must halt
    Fatal,
}

impl WorkerExit {
    pub fn code(self) -> i32 {
        match self {
            WorkerExit::Success => 0,
            WorkerExit::Failure => 1,
            WorkerExit::Retryable => 2,
            WorkerExit::Fatal => 3,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => WorkerExit::Success,
            2 => WorkerExit::Retryable,
            3 => WorkerExit::Fatal,
            _ => WorkerExit::Failure,
        }
    }
}

/// What one worker run did
#[derive(Clone, Debug)]
pub struct WorkerReport {
    /// Job handled, if any was claimed
    pub job: Option<JobId>,
    /// Status persisted for that job
    pub status: Option<JobStatus>,
    pub exit: WorkerExit,
}

impl WorkerReport {
    fn idle() -> Self {
        Self {
            job: None,
            status: None,
            exit: WorkerExit::Success,
        }
    }

    fn resolved(job: JobId, status: JobStatus, exit: WorkerExit) -> Self {
        Self {
            job: Some(job),
            status: Some(status),
            exit,
        }
    }
}

/// Worker dependencies
#[derive(Clone)]
pub struct WorkerDeps<P: Provider, E: Evaluator> {
    pub store: JobStore,
    pub mutators: ProviderRouter<P>,
    pub evaluator: E,
}

/// Worker behavior knobs
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Operator-supplied baseline artifact
    pub seed: PathBuf,
    /// Directory of generated artifacts
    pub artifacts_dir: PathBuf,
    pub retry: RetryPolicy,
    /// Treat a parsed score of exactly zero as a failed job
    pub zero_is_failure: bool,
}

/// Claim and run the next pending job
pub async fn run_next<P: Provider, E: Evaluator>(
    deps: &WorkerDeps<P, E>,
    config: &WorkerConfig,
    cancel: watch::Receiver<bool>,
) -> Result<WorkerReport, EngineError> {
    let claimed = match deps.store.claim_next() {
        Ok(claimed) => claimed,
        Err(StoreError::LockTimeout { .. }) => {
            tracing::warn!("store lock contention while claiming, retry later");
            return Ok(WorkerReport {
                job: None,
                status: None,
                exit: WorkerExit::Retryable,
            });
        }
        Err(err) => return Err(err.into()),
    };

    match claimed {
        None => {
            tracing::debug!("no claimable job");
            Ok(WorkerReport::idle())
        }
        Some((id, prior)) => run_claimed(deps, config, id, prior, cancel).await,
    }
}

/// Claim and run a specific job by id
pub async fn run_job<P: Provider, E: Evaluator>(
    deps: &WorkerDeps<P, E>,
    config: &WorkerConfig,
    id: &JobId,
    cancel: watch::Receiver<bool>,
) -> Result<WorkerReport, EngineError> {
    let (id, prior) = deps.store.claim(id)?;
    run_claimed(deps, config, id, prior, cancel).await
}

async fn run_claimed<P: Provider, E: Evaluator>(
    deps: &WorkerDeps<P, E>,
    config: &WorkerConfig,
    id: JobId,
    prior: JobStatus,
    cancel: watch::Receiver<bool>,
) -> Result<WorkerReport, EngineError> {
    let job = deps.store.read(&id)?;
    tracing::info!(job_id = %id, prior = %prior, attempt = prior.retry_count() + 1, "starting job");

    // 1. Resolve the parent artifact. The baseline aliases the seed; any
    //    other parent must have left its generated artifact behind.
    let parent_path = match &job.parent {
        None => config.seed.clone(),
        Some(parent) => {
            let parent_job = match deps.store.read(parent) {
                Ok(parent_job) => parent_job,
                Err(StoreError::NotFound(_)) => {
                    tracing::error!(job_id = %id, parent = %parent, "parent job missing from store");
                    return fail_infra(deps, id);
                }
                Err(err) => return Err(err.into()),
            };
            if parent_job.is_baseline() {
                config.seed.clone()
            } else {
                artifact_path_for(parent, &config.artifacts_dir, &config.seed)
            }
        }
    };

    if !parent_path.exists() {
        // The lineage graph is broken; retrying cannot fix it
        tracing::error!(job_id = %id, path = %parent_path.display(), "parent artifact missing");
        return fail_infra(deps, id);
    }

    // 2. Working copy at the job's deterministic output path
    let artifact = artifact_path_for(&id, &config.artifacts_dir, &config.seed);
    std::fs::create_dir_all(&config.artifacts_dir)?;
    std::fs::copy(&parent_path, &artifact)?;

    // 3. Mutate in place through the router
    let task = AgentTask::mutate(job.description.clone(), &artifact);
    let mutation = {
        let cancel = cancel.clone();
        tokio::select! {
            biased;
            _ = wait_cancelled(cancel) => {
                return interrupt(deps, id);
            }
            result = deps.mutators.invoke(&id, &task) => result,
        }
    };

    match mutation {
        Ok(_) => {}
        Err(RouteError::Exhausted { .. }) => {
            // Shared-resource signal: requeue without penalty and tell
            // the dispatcher to stop burning quota
            let next = config.retry.next_status(prior, Outcome::Requeue);
            deps.store.resolve(&id, next, None)?;
            return Ok(WorkerReport::resolved(id, next, WorkerExit::Fatal));
        }
        Err(err) => {
            tracing::warn!(job_id = %id, error = %err, "mutation failed");
            return fail_ordinary(deps, config, id, prior);
        }
    }

    // 4. A "successful" agent call that changed nothing is a failed
    //    mutation; silent no-ops must not be recorded as progress.
    if std::fs::read(&parent_path)? == std::fs::read(&artifact)? {
        tracing::warn!(job_id = %id, "mutation left artifact byte-identical to parent");
        return fail_ordinary(deps, config, id, prior);
    }

    // 5-6. Evaluate and parse
    let evaluation = tokio::select! {
        biased;
        _ = wait_cancelled(cancel) => {
            return interrupt(deps, id);
        }
        result = deps.evaluator.evaluate(&artifact) => result,
    };

    match evaluation {
        Ok(score) if score == 0.0 && config.zero_is_failure => {
            // Flagged behavior: the zero is evidence, so it is recorded
            // even though the job is classified as failed
            let next = config.retry.next_status(prior, Outcome::Failure);
            deps.store.resolve(&id, next, Some(0.0))?;
            tracing::warn!(job_id = %id, status = %next, "zero score classified as failure");
            Ok(WorkerReport::resolved(id, next, WorkerExit::Failure))
        }
        Ok(score) => {
            deps.store.resolve(&id, JobStatus::Complete, Some(score))?;
            tracing::info!(job_id = %id, score, "job complete");
            Ok(WorkerReport::resolved(id, JobStatus::Complete, WorkerExit::Success))
        }
        Err(EvalError::Timeout(deadline)) => {
            // Terminal and distinct from failure: the evaluation contract
            // itself may be unbounded, so retrying is pointless
            deps.store.resolve(&id, JobStatus::Timeout, None)?;
            tracing::warn!(job_id = %id, ?deadline, "evaluation timed out");
            Ok(WorkerReport::resolved(id, JobStatus::Timeout, WorkerExit::Failure))
        }
        Err(err) => {
            tracing::warn!(job_id = %id, error = %err, "evaluation failed");
            fail_ordinary(deps, config, id, prior)
        }
    }
}

fn fail_ordinary<P: Provider, E: Evaluator>(
    deps: &WorkerDeps<P, E>,
    config: &WorkerConfig,
    id: JobId,
    prior: JobStatus,
) -> Result<WorkerReport, EngineError> {
    let next = config.retry.next_status(prior, Outcome::Failure);
    deps.store.resolve(&id, next, None)?;
    Ok(WorkerReport::resolved(id, next, WorkerExit::Failure))
}

/// Infra failures mark the job failed outright: retrying cannot repair a
/// broken lineage graph
fn fail_infra<P: Provider, E: Evaluator>(
    deps: &WorkerDeps<P, E>,
    id: JobId,
) -> Result<WorkerReport, EngineError> {
    deps.store.resolve(&id, JobStatus::Failed, None)?;
    Ok(WorkerReport::resolved(id, JobStatus::Failed, WorkerExit::Failure))
}

fn interrupt<P: Provider, E: Evaluator>(
    deps: &WorkerDeps<P, E>,
    id: JobId,
) -> Result<WorkerReport, EngineError> {
    deps.store.resolve(&id, JobStatus::Interrupted, None)?;
    tracing::info!(job_id = %id, "job interrupted");
    Ok(WorkerReport::resolved(id, JobStatus::Interrupted, WorkerExit::Failure))
}

/// Resolves when cancellation is requested; never resolves if the sender
/// is gone without cancelling
async fn wait_cancelled(mut cancel: watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
