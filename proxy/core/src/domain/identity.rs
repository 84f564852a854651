// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource identity contract.
//!
//! Implementations live in `crate::infrastructure::identity`.

use thiserror::Error;

use crate::domain::application::ApplicationId;

/// Produces identifiers that are unique for the lifetime of the process.
///
/// Concurrent callers never observe the same value.
pub trait IdentityGenerator: Send + Sync {
    fn next_id(&self) -> Result<ApplicationId, IdentityError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The id source has nothing left to hand out. Treated as a fatal
    /// configuration error; unreachable with the UUID generator.
    #[error("identity source '{generator}' is exhausted")]
    Exhausted { generator: &'static str },
}
