// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `evoq run` - dispatcher loop

use anyhow::{bail, Context, Result};
use clap::Args;
use evoq_adapters::CommandReplenisher;
use evoq_core::Config;
use evoq_engine::{Dispatcher, DispatcherConfig, HaltReason, ProcessSpawner};
use evoq_storage::JobStore;
use std::path::Path;
use tokio::sync::watch;

#[derive(Args)]
pub struct RunArgs {
    /// Override the configured worker pool size
    #[arg(long)]
    pub concurrency: Option<usize>,
}

pub async fn run(config_path: &Path, args: RunArgs) -> Result<()> {
    let config = Config::load(config_path)?;

    if !config.queue.seed.exists() {
        bail!("baseline seed not found at {}", config.queue.seed.display());
    }

    let store = JobStore::open(&config.queue.store, config.queue.lock_wait);
    store.init()?;

    let mut dispatch = DispatcherConfig::from_config(&config);
    if let Some(concurrency) = args.concurrency {
        dispatch.concurrency = concurrency;
    }

    // Workers are this same binary, pointed at the same config
    let spawner = ProcessSpawner::current_exe(vec![
        "--config".to_string(),
        config_path.display().to_string(),
        "worker".to_string(),
    ])
    .context("could not locate the evoq binary")?;

    let replenisher = config
        .replenisher
        .as_ref()
        .map(|def| CommandReplenisher::new(&def.run));

    // First interrupt drains gracefully, the second force-kills
    let (shutdown_tx, shutdown_rx) = watch::channel(0u32);
    tokio::spawn(count_interrupts(shutdown_tx));

    let dispatcher = Dispatcher::new(store, spawner, replenisher, dispatch);
    let summary = dispatcher.run(shutdown_rx).await?;

    println!(
        "Run finished: {} completed, {} failed, {} retryable",
        summary.completed, summary.failed, summary.retryable
    );

    match summary.halted {
        None => Ok(()),
        Some(HaltReason::Interrupted) => {
            println!("Interrupted; in-flight jobs are recoverable on the next run");
            Ok(())
        }
        Some(HaltReason::QuotaExhausted) => {
            bail!("halted: provider quota exhausted")
        }
        Some(HaltReason::ConsecutiveFailures(count)) => {
            bail!("halted: {} consecutive worker failures", count)
        }
    }
}

async fn count_interrupts(tx: watch::Sender<u32>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        tracing::error!("failed to install signal handlers");
        return;
    };

    let mut count = 0u32;
    loop {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        count += 1;
        tracing::warn!(count, "interrupt received");
        if tx.send(count).is_err() {
            return;
        }
    }
}
