// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the external collaborators: mutation/proposal providers,
//! the evaluation agent, and the queue replenisher. All real adapters
//! spawn local processes; the contracts are narrow on purpose.

pub mod command;
pub mod evaluator;
pub mod replenisher;
pub mod traits;

pub use command::CommandProvider;
pub use evaluator::{parse_score, CommandEvaluator};
pub use replenisher::CommandReplenisher;
pub use traits::{
    is_quota_signature, AgentOutput, AgentTask, EvalError, Evaluator, Provider, ProviderError,
    ReplenishError, Replenisher,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeEvalResponse, FakeEvaluator, FakeProvider, FakeReplenisher, FakeResponse};
