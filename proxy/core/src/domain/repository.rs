// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Registry Interface
//!
//! Persistence contract for the `SparkApplication` aggregate. The registry is
//! the only shared mutable state in the proxy; every mutation goes through
//! this trait.
//!
//! | Operation | Failure |
//! |-----------|---------|
//! | `create` | `AlreadyExists`, `Identity` |
//! | `list` | never |
//! | `get` | `NotFound` |
//! | `delete` | `NotFound` (also on a second delete) |
//! | `transition` | `NotFound`, `Transition` |
//!
//! Implementations must make each operation atomic: a failed or cancelled
//! call leaves no partial write behind.

use async_trait::async_trait;

use crate::domain::application::{ApplicationSpec, ApplicationState, SparkApplication};
use crate::domain::identity::IdentityError;
use crate::domain::lifecycle::{TransitionError, TransitionRequest};
use crate::domain::status::ApplicationRef;

/// Result of a successful state change.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub previous: ApplicationState,
    pub application: SparkApplication,
}

#[async_trait]
pub trait ApplicationRegistry: Send + Sync {
    /// Allocate an id, insert in `PENDING`, and return the stored snapshot.
    async fn create(
        &self,
        namespace: &str,
        spec: ApplicationSpec,
    ) -> Result<SparkApplication, RegistryError>;

    /// Active resources of `namespace` in insertion order.
    async fn list(&self, namespace: &str) -> Vec<SparkApplication>;

    async fn get(&self, namespace: &str, name: &str) -> Result<SparkApplication, RegistryError>;

    /// Remove from the active index and return the removed resource.
    async fn delete(&self, namespace: &str, name: &str) -> Result<SparkApplication, RegistryError>;

    /// Apply a lifecycle transition under the same lock as other mutations.
    async fn transition(
        &self,
        namespace: &str,
        target: &ApplicationRef,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, RegistryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("application '{name}' already exists in namespace '{namespace}'")]
    AlreadyExists { namespace: String, name: String },

    #[error("application '{target}' not found in namespace '{namespace}'")]
    NotFound { namespace: String, target: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl RegistryError {
    pub fn not_found(namespace: &str, target: impl ToString) -> Self {
        Self::NotFound {
            namespace: namespace.to_string(),
            target: target.to_string(),
        }
    }
}
