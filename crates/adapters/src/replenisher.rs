// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue replenisher adapter
//!
//! Invoked with no arguments only when the queue is empty. The command
//! appends pending rows to the store itself (through the same sidecar
//! lock); the dispatcher re-counts pending after it exits.

use crate::command::{drain, spawn_in_group, truncate};
use crate::traits::{ReplenishError, Replenisher};
use async_trait::async_trait;

/// Replenisher invoked as a shell command
#[derive(Clone, Debug)]
pub struct CommandReplenisher {
    run: String,
}

impl CommandReplenisher {
    pub fn new(run: impl Into<String>) -> Self {
        Self { run: run.into() }
    }
}

#[async_trait]
impl Replenisher for CommandReplenisher {
    async fn replenish(&self) -> Result<(), ReplenishError> {
        tracing::info!(command = %self.run, "queue empty, invoking replenisher");

        let mut child = spawn_in_group(&self.run).map_err(ReplenishError::Spawn)?;
        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let status = child
            .wait()
            .await
            .map_err(ReplenishError::Spawn)?;

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        if !stdout.trim().is_empty() {
            tracing::debug!(output = %truncate(&stdout), "replenisher output");
        }

        if !status.success() {
            return Err(ReplenishError::Failed {
                code: status.code(),
                stderr: truncate(&stderr),
            });
        }
        Ok(())
    }
}
