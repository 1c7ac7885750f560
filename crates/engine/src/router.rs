// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round-robin provider routing with quota fallback
//!
//! The rotation is keyed by the job id (see `evoq_core::rotation`), so
//! attempt order is reproducible per job while load spreads evenly across
//! the configured agents. Quota-exhausted agents are skipped for the rest
//! of the call; "every agent exhausted" is a different failure from "an
//! agent ran but produced unusable output", because callers react
//! differently (halt the run vs fail the job).

use evoq_adapters::{AgentOutput, AgentTask, Provider, ProviderError};
use evoq_core::{rotation, JobId, TaskKind};
use thiserror::Error;

/// Routing failures
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no providers configured for {0}")]
    NoneConfigured(TaskKind),

    #[error("all {count} {kind} providers exhausted by quota")]
    Exhausted { kind: TaskKind, count: usize },

    #[error("no usable {kind} result: {source}")]
    Unusable {
        kind: TaskKind,
        #[source]
        source: ProviderError,
    },
}

/// Deterministic rotation plus fallback over one task category
#[derive(Clone, Debug)]
pub struct ProviderRouter<P: Provider> {
    kind: TaskKind,
    providers: Vec<P>,
}

impl<P: Provider> ProviderRouter<P> {
    pub fn new(kind: TaskKind, providers: Vec<P>) -> Self {
        Self { kind, providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Attempt providers in rotation order until one yields a usable result
    pub async fn invoke(
        &self,
        job_id: &JobId,
        task: &AgentTask,
    ) -> Result<AgentOutput, RouteError> {
        if self.providers.is_empty() {
            return Err(RouteError::NoneConfigured(self.kind));
        }

        let mut last_unusable = None;
        for index in rotation(job_id, self.providers.len()) {
            let provider = &self.providers[index];
            match provider.invoke(task).await {
                Ok(output) => {
                    tracing::debug!(
                        job_id = %job_id,
                        provider = provider.name(),
                        timed_out = output.timed_out,
                        "provider produced usable result"
                    );
                    return Ok(output);
                }
                Err(err) if err.is_quota() => {
                    tracing::warn!(
                        job_id = %job_id,
                        provider = provider.name(),
                        "provider exhausted, advancing rotation"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        job_id = %job_id,
                        provider = provider.name(),
                        error = %err,
                        "provider result unusable, advancing rotation"
                    );
                    last_unusable = Some(err);
                }
            }
        }

        match last_unusable {
            Some(source) => Err(RouteError::Unusable {
                kind: self.kind,
                source,
            }),
            None => Err(RouteError::Exhausted {
                kind: self.kind,
                count: self.providers.len(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
