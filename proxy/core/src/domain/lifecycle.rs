// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application lifecycle state machine.
//!
//! ```text
//! PENDING -> SUBMITTED -> RUNNING -> COMPLETED
//!                                 \-> FAILED
//! any non-terminal -> UNKNOWN -> RUNNING | COMPLETED | FAILED
//! ```
//!
//! `PENDING -> SUBMITTED` is the backend acceptance handshake. Every other
//! edge is driven by backend status reports. `COMPLETED` and `FAILED` are
//! terminal.
//!
//! Requests are checked optimistically against the resource they are applied
//! to. A request that lost a race, repeats the current state, or arrives out of
//! order is [`TransitionError::StaleTransition`]; the caller may re-fetch and
//! retry. A request the graph forbids is [`TransitionError::InvalidTransition`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::application::{ApplicationId, ApplicationState, SparkApplication};

impl ApplicationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Position along the forward path, used to tell late reports from illegal ones.
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Submitted => 1,
            Self::Running | Self::Unknown => 2,
            Self::Completed | Self::Failed => 3,
        }
    }

    pub fn can_transition_to(self, next: ApplicationState) -> bool {
        use ApplicationState::*;

        matches!(
            (self, next),
            (Pending, Submitted)
                | (Submitted, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Pending, Unknown)
                | (Submitted, Unknown)
                | (Running, Unknown)
                | (Unknown, Running)
                | (Unknown, Completed)
                | (Unknown, Failed)
        )
    }
}

/// A requested state change for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target: ApplicationState,
    /// Source state the caller observed. `None` accepts whatever is current.
    pub expected: Option<ApplicationState>,
    /// Identity the request was issued for, guarding against recreated names.
    pub application_id: Option<ApplicationId>,
    /// When the backend observed the new state.
    pub observed_at: Option<DateTime<Utc>>,
}

impl TransitionRequest {
    pub fn to(target: ApplicationState) -> Self {
        Self {
            target,
            expected: None,
            application_id: None,
            observed_at: None,
        }
    }

    pub fn expecting(mut self, expected: ApplicationState) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn for_application(mut self, id: ApplicationId) -> Self {
        self.application_id = Some(id);
        self
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// The target equals the current state.
    Duplicate,
    /// The target lies behind the current state.
    OutOfOrder,
    /// The caller's expected source state no longer holds.
    SourceMismatch { expected: ApplicationState },
    /// The request was issued for a different incarnation of the name.
    IdentityMismatch { requested: ApplicationId },
    /// The observation predates the last applied transition.
    Outdated,
}

impl StaleReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::OutOfOrder => "out_of_order",
            Self::SourceMismatch { .. } => "source_mismatch",
            Self::IdentityMismatch { .. } => "identity_mismatch",
            Self::Outdated => "outdated",
        }
    }
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate => f.write_str("state already applied"),
            Self::OutOfOrder => f.write_str("report arrived out of order"),
            Self::SourceMismatch { expected } => write!(f, "expected source state {expected}"),
            Self::IdentityMismatch { requested } => {
                write!(f, "request targets application {requested}")
            }
            Self::Outdated => f.write_str("observation predates the last transition"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ApplicationState,
        to: ApplicationState,
    },

    #[error("stale transition to {to} (current state {current}): {reason}")]
    StaleTransition {
        current: ApplicationState,
        to: ApplicationState,
        reason: StaleReason,
    },
}

impl SparkApplication {
    /// Applies `request` and returns the previous state. The resource is left
    /// untouched on error.
    pub fn apply_transition(
        &mut self,
        request: &TransitionRequest,
    ) -> Result<ApplicationState, TransitionError> {
        let current = self.state;
        let to = request.target;
        let stale = |reason| TransitionError::StaleTransition {
            current,
            to,
            reason,
        };

        if let Some(requested) = &request.application_id {
            if requested != &self.id {
                return Err(stale(StaleReason::IdentityMismatch {
                    requested: requested.clone(),
                }));
            }
        }

        if current.is_terminal() {
            return Err(TransitionError::InvalidTransition { from: current, to });
        }

        if let Some(expected) = request.expected {
            if expected != current {
                return Err(stale(StaleReason::SourceMismatch { expected }));
            }
        }

        // A PENDING resource has only the proxy's own creation stamp, which a
        // backend clock running behind would otherwise make every report predate.
        if let Some(observed_at) = request.observed_at {
            if current != ApplicationState::Pending && observed_at < self.updated_at {
                return Err(stale(StaleReason::Outdated));
            }
        }

        if to == current {
            return Err(stale(StaleReason::Duplicate));
        }

        if !current.can_transition_to(to) {
            if to.rank() < current.rank() {
                return Err(stale(StaleReason::OutOfOrder));
            }
            return Err(TransitionError::InvalidTransition { from: current, to });
        }

        self.state = to;
        self.updated_at = match request.observed_at {
            Some(at) => at.max(self.updated_at),
            None => Utc::now(),
        };
        Ok(current)
    }
}
