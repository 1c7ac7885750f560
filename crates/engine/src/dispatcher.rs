// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool supervision
//!
//! The dispatcher is single-threaded and cooperative: it polls worker
//! liveness and queue depth on a fixed interval rather than blocking on
//! completion events, which keeps supervision uniform across a
//! heterogeneous pool. It stops spawning on a fatal quota signal (a
//! shared-resource problem, not a per-job defect), invokes the
//! replenisher once per empty-queue episode, and owns the
//! graceful-then-forced shutdown sequence.

use crate::error::EngineError;
use crate::spawn::{WorkerHandle, WorkerSpawner};
use crate::worker::WorkerExit;
use evoq_adapters::Replenisher;
use evoq_storage::JobStore;
use std::time::Duration;
use tokio::sync::watch;

/// Dispatcher knobs, usually derived from `[dispatch]` in evoq.toml
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub grace_period: Duration,
    /// Halt after this many consecutive ordinary failures (0 disables)
    pub max_consecutive_failures: u32,
}

impl DispatcherConfig {
    pub fn from_config(config: &evoq_core::Config) -> Self {
        Self {
            concurrency: config.dispatch.concurrency,
            poll_interval: config.dispatch.poll_interval,
            grace_period: config.dispatch.grace_period,
            max_consecutive_failures: config.dispatch.max_consecutive_failures,
        }
    }
}

/// Why a run stopped before the queue was dry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaltReason {
    /// A worker reported pool-wide quota exhaustion (exit code 3)
    QuotaExhausted,
    /// The consecutive-failure budget was spent
    ConsecutiveFailures(u32),
    /// Operator interrupt
    Interrupted,
}

/// Tally of one dispatcher run
#[derive(Clone, Copy, Debug, Default)]
pub struct RunSummary {
    pub completed: u32,
    pub failed: u32,
    pub retryable: u32,
    pub halted: Option<HaltReason>,
}

/// Supervises a bounded pool of worker processes
pub struct Dispatcher<S: WorkerSpawner, R: Replenisher> {
    store: JobStore,
    spawner: S,
    replenisher: Option<R>,
    config: DispatcherConfig,
}

impl<S: WorkerSpawner, R: Replenisher> Dispatcher<S, R> {
    pub fn new(
        store: JobStore,
        spawner: S,
        replenisher: Option<R>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            spawner,
            replenisher,
            config,
        }
    }

    /// Run until the queue is dry, a halt condition fires, or the
    /// operator interrupts. `shutdown` counts received interrupts: the
    /// first starts a graceful drain, the second forces a kill.
    pub async fn run(&self, mut shutdown: watch::Receiver<u32>) -> Result<RunSummary, EngineError> {
        // Boot recovery: jobs left running by a dead process are requeued
        let requeued = self.store.reset_stale_running()?;
        if requeued > 0 {
            tracing::info!(count = requeued, "recovered stale running jobs");
        }

        let mut summary = RunSummary::default();
        let mut active: Vec<S::Handle> = Vec::new();
        let mut consecutive_failures: u32 = 0;
        let mut halt: Option<HaltReason> = None;
        let mut replenished = false;

        loop {
            // Reap finished workers and classify their exit codes
            let mut running = Vec::new();
            for mut handle in active.drain(..) {
                match handle.try_wait()? {
                    Some(exit) => {
                        self.classify(exit, &mut summary, &mut consecutive_failures, &mut halt)
                    }
                    None => running.push(handle),
                }
            }
            active = running;

            if *shutdown.borrow_and_update() > 0 {
                halt.get_or_insert(HaltReason::Interrupted);
                self.drain_workers(&mut active, &mut shutdown).await;
                break;
            }

            if let Some(reason) = halt {
                // Stop spawning; drain what is still in flight
                if active.is_empty() {
                    tracing::warn!(?reason, "run halted");
                    break;
                }
            } else {
                let pending = self.store.count_pending()?;

                if pending == 0 && active.is_empty() {
                    match &self.replenisher {
                        Some(replenisher) if !replenished => {
                            replenished = true;
                            replenisher.replenish().await?;
                            // Re-count immediately: continue or terminate
                            continue;
                        }
                        _ => {
                            tracing::info!("queue dry, terminating cleanly");
                            break;
                        }
                    }
                }

                if pending > 0 {
                    // A later empty-queue episode may replenish again
                    replenished = false;

                    let slots = self.config.concurrency.saturating_sub(active.len());
                    for _ in 0..slots.min(pending) {
                        let handle = self.spawner.spawn()?;
                        tracing::debug!(pid = ?handle.pid(), "spawned worker");
                        active.push(handle);
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        summary.halted = halt;
        Ok(summary)
    }

    fn classify(
        &self,
        exit: WorkerExit,
        summary: &mut RunSummary,
        consecutive_failures: &mut u32,
        halt: &mut Option<HaltReason>,
    ) {
        match exit {
            WorkerExit::Success => {
                summary.completed += 1;
                *consecutive_failures = 0;
            }
            WorkerExit::Retryable => {
                // Does not count against the consecutive-failure budget
                summary.retryable += 1;
            }
            WorkerExit::Failure => {
                summary.failed += 1;
                *consecutive_failures += 1;
                let budget = self.config.max_consecutive_failures;
                if budget > 0 && *consecutive_failures >= budget && halt.is_none() {
                    tracing::error!(
                        failures = *consecutive_failures,
                        "consecutive-failure budget spent, halting"
                    );
                    *halt = Some(HaltReason::ConsecutiveFailures(*consecutive_failures));
                }
            }
            WorkerExit::Fatal => {
                // Quota exhaustion is a shared-resource signal, not a
                // per-job defect: stop burning it
                if halt.is_none() {
                    tracing::error!("worker reported quota exhaustion, halting");
                    *halt = Some(HaltReason::QuotaExhausted);
                }
            }
        }
    }

    /// Graceful-then-forced shutdown. Workers get SIGTERM and a bounded
    /// grace period; a second interrupt or grace expiry force-kills the
    /// remainder. Jobs left `running` by a killed worker are requeued by
    /// `reset_stale_running` at the next startup.
    async fn drain_workers(&self, active: &mut Vec<S::Handle>, shutdown: &mut watch::Receiver<u32>) {
        if active.is_empty() {
            return;
        }

        tracing::info!(count = active.len(), "interrupt received, terminating workers");
        for handle in active.iter() {
            handle.terminate();
        }

        let deadline = tokio::time::Instant::now() + self.config.grace_period;
        loop {
            let mut running = Vec::new();
            for mut handle in active.drain(..) {
                match handle.try_wait() {
                    Ok(Some(_)) => {}
                    _ => running.push(handle),
                }
            }
            *active = running;

            if active.is_empty() {
                tracing::info!("all workers exited within the grace period");
                return;
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                tracing::warn!("grace period expired");
                break;
            }

            let next_poll = now + Duration::from_millis(50);
            tokio::select! {
                _ = tokio::time::sleep_until(next_poll.min(deadline)) => {}
                _ = shutdown.changed() => {
                    tracing::warn!("second interrupt, skipping remaining grace");
                    break;
                }
            }
        }

        tracing::warn!(count = active.len(), "force-killing remaining workers");
        for handle in active.iter() {
            handle.kill();
        }
        for mut handle in active.drain(..) {
            let _ = handle.wait().await;
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
