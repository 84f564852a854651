// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Execution backend contract.
//!
//! The backend runs submitted applications and reports progress on its own
//! schedule through [`StatusReport`](crate::domain::status::StatusReport)s.
//! `submit` returning `Ok` only means the request was handed over; acceptance
//! is confirmed later by a `SUBMITTED` report.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::application::SparkApplication;

#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn submit(&self, application: &SparkApplication) -> Result<(), BackendError>;

    async fn remove(&self, application: &SparkApplication) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("execution backend unavailable: {0}")]
    Unavailable(String),
}
