// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use evoq_adapters::ReplenishError;
use evoq_storage::StoreError;
use thiserror::Error;

/// Errors from worker and dispatcher runs
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Replenish(#[from] ReplenishError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
