// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status machine and retry policy
//!
//! Statuses round-trip through the store as plain strings; an empty string
//! parses as `Pending` so short rows written by external replenishers are
//! picked up without a rewrite.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Waiting to be claimed
    Pending,
    /// Claimed exclusively by one worker
    Running,
    /// Terminal success; performance is recorded
    Complete,
    /// Terminal failure after the retry budget is spent
    Failed,
    /// Failed n times so far; claimable again
    FailedRetry(u32),
    /// Evaluation exceeded its wall-clock deadline; terminal, not auto-retried
    Timeout,
    /// Resolved by an operator interrupt; never left as `Running`
    Interrupted,
}

impl JobStatus {
    /// Whether a worker may claim a job in this status
    pub fn is_claimable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::FailedRetry(_))
    }

    /// Whether this status ends the job's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Timeout | JobStatus::Interrupted
        )
    }

    /// Number of ordinary failures accumulated so far
    pub fn retry_count(&self) -> u32 {
        match self {
            JobStatus::FailedRetry(n) => *n,
            _ => 0,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Complete => write!(f, "complete"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::FailedRetry(n) => write!(f, "failed-retry{}", n),
            JobStatus::Timeout => write!(f, "timeout"),
            JobStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Error parsing a status string from the store
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status: {0:?}")]
pub struct StatusParseError(pub String);

impl FromStr for JobStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "complete" => Ok(JobStatus::Complete),
            "failed" => Ok(JobStatus::Failed),
            "timeout" => Ok(JobStatus::Timeout),
            "interrupted" => Ok(JobStatus::Interrupted),
            other => {
                if let Some(n) = other.strip_prefix("failed-retry") {
                    if let Ok(n) = n.parse::<u32>() {
                        if n >= 1 {
                            return Ok(JobStatus::FailedRetry(n));
                        }
                    }
                }
                Err(StatusParseError(other.to_string()))
            }
        }
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Classified result of one worker attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Mutation verified and evaluation parsed
    Success,
    /// Ordinary failure; feeds the retry ladder
    Failure,
    /// Retryable infra failure (e.g. provider quota); no penalty
    Requeue,
    /// Evaluation deadline expired
    Timeout,
    /// Operator interrupt landed mid-attempt
    Interrupted,
}

/// Maps (prior status, outcome) to the next status
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Ordinary failures tolerated before the terminal `failed`
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Pure transition function
    ///
    /// K consecutive ordinary failures yield `failed-retry(min(K, max))`
    /// for K <= max and terminal `failed` for K > max, never skipping a
    /// level. A requeue resets nothing: the retry counter lives in the
    /// prior status and an infra failure carries no penalty.
    pub fn next_status(&self, prior: JobStatus, outcome: Outcome) -> JobStatus {
        match outcome {
            Outcome::Success => JobStatus::Complete,
            Outcome::Requeue => prior_requeue(prior),
            Outcome::Timeout => JobStatus::Timeout,
            Outcome::Interrupted => JobStatus::Interrupted,
            Outcome::Failure => match prior {
                JobStatus::FailedRetry(n) if n < self.max_retries => JobStatus::FailedRetry(n + 1),
                JobStatus::FailedRetry(_) | JobStatus::Failed => JobStatus::Failed,
                _ if self.max_retries >= 1 => JobStatus::FailedRetry(1),
                _ => JobStatus::Failed,
            },
        }
    }
}

/// A requeued retry keeps its accumulated counter; a fresh attempt goes
/// back to plain pending.
fn prior_requeue(prior: JobStatus) -> JobStatus {
    match prior {
        JobStatus::FailedRetry(n) => JobStatus::FailedRetry(n),
        _ => JobStatus::Pending,
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
