// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluation agent adapter
//!
//! The evaluator is invoked with the artifact path as its only variable
//! and must print a bare number or a JSON object carrying a numeric
//! `performance` or `score` field. An optional hard deadline kills the
//! process group on expiry; that is the terminal `timeout` outcome, never
//! a hung worker.

use crate::command::{drain, kill_group, spawn_in_group, truncate};
use crate::traits::{EvalError, Evaluator};
use async_trait::async_trait;
use evoq_core::{interpolate, EvaluatorConfig};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Evaluation agent invoked as a shell command
#[derive(Clone, Debug)]
pub struct CommandEvaluator {
    run: String,
    timeout: Option<Duration>,
}

impl CommandEvaluator {
    pub fn new(run: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_config(config: &EvaluatorConfig) -> Self {
        Self {
            run: config.run.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl Evaluator for CommandEvaluator {
    async fn evaluate(&self, artifact: &Path) -> Result<f64, EvalError> {
        let mut vars = HashMap::new();
        vars.insert("artifact".to_string(), artifact.display().to_string());
        let command = interpolate(&self.run, &vars);

        tracing::debug!(%command, artifact = %artifact.display(), "evaluating artifact");

        let mut child = spawn_in_group(&command).map_err(EvalError::Spawn)?;
        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    kill_group(&child);
                    let _ = child.wait().await;
                    tracing::warn!(?timeout, "evaluation deadline expired, killed process group");
                    return Err(EvalError::Timeout(timeout));
                }
            },
            None => child.wait().await?,
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(EvalError::Failed {
                code: status.code(),
                stderr: truncate(&stderr),
            });
        }

        parse_score(&stdout).ok_or_else(|| EvalError::Unparseable {
            output: truncate(&stdout),
        })
    }
}

/// Parse evaluator stdout: a bare number, or a JSON object with a numeric
/// `performance` or `score` field. Any other shape is a parse failure.
pub fn parse_score(output: &str) -> Option<f64> {
    let trimmed = output.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return Some(value);
    }

    let json: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    let object = json.as_object()?;
    object
        .get("performance")
        .or_else(|| object.get("score"))?
        .as_f64()
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
