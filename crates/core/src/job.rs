// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job records for the evolution queue

use crate::status::JobStatus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unique identifier for a job, scoped to a generation (e.g. `gen07-014`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One candidate in the evolution loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Parent this candidate mutates from; `None` means the baseline seed
    pub parent: Option<JobId>,
    /// Free-text instruction for the mutation agent
    pub description: String,
    /// Fitness, higher is better; set when the job completes
    pub performance: Option<f64>,
    pub status: JobStatus,
}

impl Job {
    /// Create a fresh pending job
    pub fn pending(
        id: impl Into<String>,
        parent: Option<JobId>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: JobId::new(id),
            parent,
            description: description.into(),
            performance: None,
            status: JobStatus::Pending,
        }
    }

    /// Whether this is the generation-zero seed (owns no generated artifact)
    pub fn is_baseline(&self) -> bool {
        self.parent.is_none()
    }

    /// Deterministic path of this job's generated artifact
    pub fn artifact_path(&self, artifacts_dir: &Path, seed: &Path) -> PathBuf {
        artifact_path_for(&self.id, artifacts_dir, seed)
    }
}

/// Deterministic artifact path for a job id, carrying the seed's extension
pub fn artifact_path_for(id: &JobId, artifacts_dir: &Path, seed: &Path) -> PathBuf {
    let mut name = id.0.clone();
    if let Some(ext) = seed.extension().and_then(|e| e.to_str()) {
        name.push('.');
        name.push_str(ext);
    }
    artifacts_dir.join(name)
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
