// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! evoq-engine: worker lifecycle and dispatcher supervision
//!
//! A worker is a single-shot unit of work (claim, mutate, evaluate,
//! classify, persist) run as its own OS process. The dispatcher supervises
//! a bounded pool of workers, replenishes the queue when it drains, and
//! owns graceful-then-forced shutdown. Coordination happens only through
//! the job store.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dispatcher;
pub mod error;
pub mod router;
pub mod spawn;
pub mod worker;

pub use dispatcher::{Dispatcher, DispatcherConfig, HaltReason, RunSummary};
pub use error::EngineError;
pub use router::{ProviderRouter, RouteError};
pub use spawn::{ProcessSpawner, ProcessWorker, WorkerHandle, WorkerSpawner};
pub use worker::{run_job, run_next, WorkerConfig, WorkerDeps, WorkerExit, WorkerReport};
