//! evoq-core: Core library for the evoq evolution queue
//!
//! This crate provides:
//! - Job records and the status/retry state machine
//! - Deterministic provider rotation for round-robin routing
//! - Command-template interpolation
//! - TOML configuration for the queue, dispatcher, and agents

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod job;
pub mod router;
pub mod status;
pub mod template;

// Re-exports
pub use config::{
    Config, ConfigError, DispatchConfig, EvaluatorConfig, ProviderDef, QueueConfig,
    ReplenisherConfig, RetryConfig, ScoringConfig,
};
pub use job::{artifact_path_for, Job, JobId};
pub use router::{rotation, TaskKind};
pub use status::{JobStatus, Outcome, RetryPolicy, StatusParseError};
pub use template::interpolate;
