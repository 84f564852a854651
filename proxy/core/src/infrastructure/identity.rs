// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::application::ApplicationId;
use crate::domain::config::IdStrategy;
use crate::domain::identity::{IdentityError, IdentityGenerator};

const ID_PREFIX: &str = "spark-app-";

/// Random v4 UUIDs. Unique across restarts without persisted state.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdentityGenerator;

impl IdentityGenerator for UuidIdentityGenerator {
    fn next_id(&self) -> Result<ApplicationId, IdentityError> {
        Ok(ApplicationId(format!("{ID_PREFIX}{}", Uuid::new_v4())))
    }
}

/// Monotonic counter. Unique within one process only.
#[derive(Debug)]
pub struct SequentialIdentityGenerator {
    next: AtomicU64,
}

impl SequentialIdentityGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityGenerator for SequentialIdentityGenerator {
    fn next_id(&self) -> Result<ApplicationId, IdentityError> {
        let n = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map_err(|_| IdentityError::Exhausted {
                generator: "sequential",
            })?;
        Ok(ApplicationId(format!("{ID_PREFIX}{n}")))
    }
}

pub fn identity_generator_for(strategy: IdStrategy) -> Arc<dyn IdentityGenerator> {
    match strategy {
        IdStrategy::Uuid => Arc::new(UuidIdentityGenerator),
        IdStrategy::Sequential => Arc::new(SequentialIdentityGenerator::new()),
    }
}
