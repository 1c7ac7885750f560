// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! evoq.toml configuration
//!
//! One TOML file at the project root describes the queue paths, the
//! dispatcher, the retry budget, and the external agents. Providers are
//! listed per task category; each entry is a command template interpolating
//! `{description}` and `{artifact}`.

use crate::router::TaskKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name
pub const CONFIG_FILE: &str = "evoq.toml";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub queue: QueueConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub provider: ProviderTables,
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub replenisher: Option<ReplenisherConfig>,
}

/// Queue paths and locking
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Path of the job table (CSV)
    pub store: PathBuf,
    /// Directory for generated artifacts
    pub artifacts: PathBuf,
    /// Operator-supplied baseline seed file
    pub seed: PathBuf,
    /// How long a store mutation may wait for the lock before failing loudly
    #[serde(default = "default_lock_wait", with = "humantime_serde")]
    pub lock_wait: Duration,
}

/// Dispatcher pool sizing and shutdown
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Concurrency ceiling for the worker pool
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Liveness/queue-depth poll interval
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Grace period between SIGTERM and SIGKILL at shutdown
    #[serde(default = "default_grace_period", with = "humantime_serde")]
    pub grace_period: Duration,
    /// Halt the run after this many consecutive worker failures (0 disables)
    #[serde(default)]
    pub max_consecutive_failures: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval: default_poll_interval(),
            grace_period: default_grace_period(),
            max_consecutive_failures: 0,
        }
    }
}

/// Retry budget for ordinary failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

/// Score classification
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Treat a parsed score of exactly zero as a failed job rather than a
    /// legitimate low score. The zero is still recorded as performance.
    #[serde(default = "default_zero_is_failure")]
    pub zero_is_failure: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            zero_is_failure: default_zero_is_failure(),
        }
    }
}

/// Provider lists per task category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderTables {
    #[serde(default)]
    pub mutate: Vec<ProviderDef>,
    #[serde(default)]
    pub propose: Vec<ProviderDef>,
}

/// One interchangeable external agent
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderDef {
    pub name: String,
    /// Command template; `{description}` and `{artifact}` are interpolated
    pub run: String,
    /// Bounded invocation timeout; expiry with output still counts as success
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
}

/// Evaluation agent
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorConfig {
    /// Command template; `{artifact}` is interpolated
    pub run: String,
    /// Hard wall-clock deadline; expiry kills the process group
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
}

/// Queue replenisher, invoked with no arguments when the queue is empty
#[derive(Debug, Clone, Deserialize)]
pub struct ReplenisherConfig {
    pub run: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found at {0}")]
    NotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no providers configured for category {0}")]
    NoProviders(&'static str),

    #[error("provider {0:?} has an empty run template")]
    EmptyRun(String),
}

impl Config {
    /// Parse configuration from TOML text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Providers configured for the given task category
    pub fn providers_for(&self, kind: TaskKind) -> &[ProviderDef] {
        match kind {
            TaskKind::Mutate => &self.provider.mutate,
            TaskKind::Propose => &self.provider.propose,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.mutate.is_empty() {
            return Err(ConfigError::NoProviders(TaskKind::Mutate.as_str()));
        }
        for def in self.provider.mutate.iter().chain(&self.provider.propose) {
            if def.run.trim().is_empty() {
                return Err(ConfigError::EmptyRun(def.name.clone()));
            }
        }
        Ok(())
    }
}

fn default_lock_wait() -> Duration {
    Duration::from_secs(5)
}

fn default_concurrency() -> usize {
    2
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_grace_period() -> Duration {
    Duration::from_secs(10)
}

fn default_max_retries() -> u32 {
    2
}

fn default_zero_is_failure() -> bool {
    true
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
