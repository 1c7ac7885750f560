// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter trait definitions for the external agents

use async_trait::async_trait;
use evoq_core::TaskKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Providers (mutation / proposal agents)
// =============================================================================

/// Input to one provider invocation
#[derive(Debug, Clone)]
pub struct AgentTask {
    pub kind: TaskKind,
    /// Free-text instruction for the agent
    pub description: String,
    /// Artifact the agent edits in place (mutation tasks)
    pub artifact: Option<PathBuf>,
}

impl AgentTask {
    /// A mutation task against a working-copy artifact
    pub fn mutate(description: impl Into<String>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            kind: TaskKind::Mutate,
            description: description.into(),
            artifact: Some(artifact.into()),
        }
    }
}

/// Output from a successful provider invocation
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub stdout: String,
    /// The bounded invocation timeout expired but output was produced;
    /// slow-but-complete beats discarding work
    pub timed_out: bool,
}

/// Errors from provider invocations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} exited with {code:?}: {stderr}")]
    Failed {
        name: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{name} produced no output")]
    EmptyOutput { name: String },

    #[error("{name} timed out with no output")]
    TimedOut { name: String },

    #[error("{name} hit a quota or rate limit")]
    Quota { name: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether this failure means the agent is exhausted for this call
    pub fn is_quota(&self) -> bool {
        matches!(self, ProviderError::Quota { .. })
    }
}

/// An interchangeable external agent for a task category
#[async_trait]
pub trait Provider: Clone + Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Invoke the agent; a usable result has a success exit (or timed out
    /// with output), non-empty stdout, and no quota signature.
    async fn invoke(&self, task: &AgentTask) -> Result<AgentOutput, ProviderError>;
}

/// Known resource-exhaustion signatures in agent output.
///
/// Matching is deliberately coarse: a false positive requeues a job
/// without penalty, a false negative burns the retry budget.
pub fn is_quota_signature(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["rate limit", "rate-limit", "quota", "credit balance", "out of credits", "too many requests", "429"]
        .iter()
        .any(|sig| lower.contains(sig))
}

// =============================================================================
// Evaluator
// =============================================================================

/// Errors from evaluation runs
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("evaluation exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("failed to spawn evaluator: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("evaluator exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("could not parse evaluator output: {output:?}")]
    Unparseable { output: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scores an artifact; prints a bare number or a JSON object with a
/// numeric `performance` or `score` field.
#[async_trait]
pub trait Evaluator: Clone + Send + Sync + 'static {
    async fn evaluate(&self, artifact: &Path) -> Result<f64, EvalError>;
}

// =============================================================================
// Replenisher
// =============================================================================

/// Errors from replenisher runs
#[derive(Debug, Error)]
pub enum ReplenishError {
    #[error("failed to spawn replenisher: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("replenisher exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Proposes new pending jobs when the queue is empty. The implementation
/// appends to the store itself (through the same lock); the caller only
/// re-counts pending afterwards.
#[async_trait]
pub trait Replenisher: Clone + Send + Sync + 'static {
    async fn replenish(&self) -> Result<(), ReplenishError>;
}
