// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `evoq worker` - single-shot worker cycle
//!
//! Claims one job (or an explicit id), runs mutate/evaluate/persist, and
//! exits with the code the dispatcher interprets: 0 success, 1 ordinary
//! failure, 2 retryable, 3 fatal quota exhaustion.

use anyhow::Result;
use clap::Args;
use evoq_adapters::{CommandEvaluator, CommandProvider};
use evoq_core::{Config, JobId, RetryPolicy, TaskKind};
use evoq_engine::{run_job, run_next, ProviderRouter, WorkerConfig, WorkerDeps};
use evoq_storage::JobStore;
use std::path::Path;
use tokio::sync::watch;

#[derive(Args)]
pub struct WorkerArgs {
    /// Run a specific job instead of claiming the next pending one
    #[arg(long)]
    pub id: Option<String>,
}

pub async fn worker(config_path: &Path, args: WorkerArgs) -> Result<()> {
    let config = Config::load(config_path)?;

    let store = JobStore::open(&config.queue.store, config.queue.lock_wait);
    let providers: Vec<CommandProvider> = config
        .providers_for(TaskKind::Mutate)
        .iter()
        .map(CommandProvider::from_def)
        .collect();

    let deps = WorkerDeps {
        store,
        mutators: ProviderRouter::new(TaskKind::Mutate, providers),
        evaluator: CommandEvaluator::from_config(&config.evaluator),
    };
    let worker_config = WorkerConfig {
        seed: config.queue.seed.clone(),
        artifacts_dir: config.queue.artifacts.clone(),
        retry: RetryPolicy::new(config.retry.max_retries),
        zero_is_failure: config.scoring.zero_is_failure,
    };

    // An interrupt resolves the in-flight job to `interrupted` instead of
    // leaving it running
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(cancel_on_interrupt(cancel_tx));

    let report = match args.id {
        Some(id) => run_job(&deps, &worker_config, &JobId::new(id), cancel_rx).await?,
        None => run_next(&deps, &worker_config, cancel_rx).await?,
    };

    if let (Some(job), Some(status)) = (&report.job, report.status) {
        println!("{} -> {}", job, status);
    }
    std::process::exit(report.exit.code());
}

async fn cancel_on_interrupt(tx: watch::Sender<bool>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        tracing::error!("failed to install signal handlers");
        return;
    };

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
    tracing::warn!("interrupt received, resolving in-flight job");
    let _ = tx.send(true);
}
