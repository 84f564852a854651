// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Status reports emitted asynchronously by the execution backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::application::{ApplicationId, ApplicationState};
use crate::domain::lifecycle::TransitionRequest;

/// How a report or request addresses a resource inside its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationRef {
    Name(String),
    Id(ApplicationId),
}

impl fmt::Display for ApplicationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "id={id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub namespace: String,
    pub target: ApplicationRef,
    pub state: ApplicationState,
    pub observed_at: DateTime<Utc>,
}

impl StatusReport {
    pub fn new(namespace: impl Into<String>, target: ApplicationRef, state: ApplicationState) -> Self {
        Self {
            namespace: namespace.into(),
            target,
            state,
            observed_at: Utc::now(),
        }
    }

    /// Reports missing a namespace or target cannot be routed and are dropped.
    pub fn is_well_formed(&self) -> bool {
        let target_present = match &self.target {
            ApplicationRef::Name(name) => !name.is_empty(),
            ApplicationRef::Id(id) => !id.as_str().is_empty(),
        };
        !self.namespace.is_empty() && target_present
    }

    /// Backend reports never carry an expected source state: the registry
    /// compares against whatever is current when the report is applied.
    pub fn to_transition_request(&self) -> TransitionRequest {
        let request = TransitionRequest::to(self.state).observed_at(self.observed_at);
        match &self.target {
            ApplicationRef::Id(id) => request.for_application(id.clone()),
            ApplicationRef::Name(_) => request,
        }
    }
}
