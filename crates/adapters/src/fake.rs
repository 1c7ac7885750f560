// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::traits::{
    AgentOutput, AgentTask, EvalError, Evaluator, Provider, ProviderError, ReplenishError,
    Replenisher,
};
use async_trait::async_trait;
use evoq_core::Job;
use evoq_storage::JobStore;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted response for one fake provider invocation
#[derive(Debug, Clone)]
pub enum FakeResponse {
    /// Append bytes to the task artifact, then succeed
    Edit { stdout: String },
    /// Succeed without touching the artifact (a silent no-op agent)
    Noop { stdout: String },
    /// Report a quota/rate-limit signature
    Quota,
    /// Exit non-zero
    Fail { stderr: String },
    /// Exit zero with empty output
    Empty,
}

/// Fake provider with scripted responses and call recording
#[derive(Clone)]
pub struct FakeProvider {
    name: String,
    responses: Arc<Mutex<VecDeque<FakeResponse>>>,
    calls: Arc<Mutex<Vec<AgentTask>>>,
}

impl FakeProvider {
    /// A provider that edits the artifact on every call
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a scripted response; once the queue drains, calls fall back
    /// to `Edit`
    pub fn respond(self, response: FakeResponse) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
        self
    }

    /// All recorded invocations
    pub fn calls(&self) -> Vec<AgentTask> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, task: &AgentTask) -> Result<AgentOutput, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(task.clone());

        let response = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(FakeResponse::Edit {
                stdout: "applied".to_string(),
            });

        match response {
            FakeResponse::Edit { stdout } => {
                if let Some(artifact) = &task.artifact {
                    append_line(artifact, "// mutated")?;
                }
                Ok(AgentOutput {
                    stdout,
                    timed_out: false,
                })
            }
            FakeResponse::Noop { stdout } => Ok(AgentOutput {
                stdout,
                timed_out: false,
            }),
            FakeResponse::Quota => Err(ProviderError::Quota {
                name: self.name.clone(),
            }),
            FakeResponse::Fail { stderr } => Err(ProviderError::Failed {
                name: self.name.clone(),
                code: Some(1),
                stderr,
            }),
            FakeResponse::Empty => Err(ProviderError::EmptyOutput {
                name: self.name.clone(),
            }),
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
    writeln!(file, "{}", line)
}

/// Scripted response for one fake evaluation
#[derive(Debug, Clone)]
pub enum FakeEvalResponse {
    Score(f64),
    Timeout,
    Fail,
    Garbage,
}

/// Fake evaluator with scripted scores
#[derive(Clone)]
pub struct FakeEvaluator {
    responses: Arc<Mutex<VecDeque<FakeEvalResponse>>>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeEvaluator {
    /// An evaluator that scores 1.0 on every call
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn respond(self, response: FakeEvalResponse) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for FakeEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Evaluator for FakeEvaluator {
    async fn evaluate(&self, artifact: &Path) -> Result<f64, EvalError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(artifact.to_path_buf());

        let response = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(FakeEvalResponse::Score(1.0));

        match response {
            FakeEvalResponse::Score(value) => Ok(value),
            FakeEvalResponse::Timeout => Err(EvalError::Timeout(Duration::from_secs(1))),
            FakeEvalResponse::Fail => Err(EvalError::Failed {
                code: Some(1),
                stderr: "fake failure".to_string(),
            }),
            FakeEvalResponse::Garbage => Err(EvalError::Unparseable {
                output: "fake garbage".to_string(),
            }),
        }
    }
}

/// Fake replenisher appending scripted batches to a real store
#[derive(Clone)]
pub struct FakeReplenisher {
    store: JobStore,
    batches: Arc<Mutex<VecDeque<Vec<Job>>>>,
    calls: Arc<Mutex<usize>>,
}

impl FakeReplenisher {
    /// A replenisher that never adds jobs
    pub fn new(store: JobStore) -> Self {
        Self {
            store,
            batches: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a batch to append on the next call
    pub fn batch(self, jobs: Vec<Job>) -> Self {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(jobs);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Replenisher for FakeReplenisher {
    async fn replenish(&self) -> Result<(), ReplenishError> {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        let batch = self
            .batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        if let Some(jobs) = batch {
            self.store
                .append(&jobs)
                .map_err(|err| ReplenishError::Failed {
                    code: None,
                    stderr: err.to_string(),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
