// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};

use crate::domain::application::{ApplicationId, ApplicationState};

/// Changes to the registry, published after the mutation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationEvent {
    Created {
        namespace: String,
        name: String,
        id: ApplicationId,
        created_at: DateTime<Utc>,
    },
    StateChanged {
        namespace: String,
        name: String,
        id: ApplicationId,
        from: ApplicationState,
        to: ApplicationState,
        changed_at: DateTime<Utc>,
    },
    Deleted {
        namespace: String,
        name: String,
        id: ApplicationId,
        deleted_at: DateTime<Utc>,
    },
}

impl ApplicationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::StateChanged { .. } => "state_changed",
            Self::Deleted { .. } => "deleted",
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::Created { namespace, .. }
            | Self::StateChanged { namespace, .. }
            | Self::Deleted { namespace, .. } => namespace,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Created { name, .. }
            | Self::StateChanged { name, .. }
            | Self::Deleted { name, .. } => name,
        }
    }

    pub fn concerns(&self, namespace: &str, name: &str) -> bool {
        self.namespace() == namespace && self.name() == name
    }
}
