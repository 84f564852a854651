// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Simulated execution backend.
//!
//! Stands in for a cluster orchestrator: it accepts submissions and, on its own
//! schedule, emits status reports onto the channel consumed by
//! `StatusReconciler`. Acceptance is reported as `SUBMITTED` after one
//! `step_delay`; with `auto_progress` the job then reports `RUNNING` and
//! `COMPLETED`.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::application::{ApplicationId, ApplicationState, SparkApplication};
use crate::domain::backend::{BackendError, ExecutionBackend};
use crate::domain::config::BackendConfig;
use crate::domain::status::{ApplicationRef, StatusReport};

pub struct SimulatedBackend {
    reports: mpsc::Sender<StatusReport>,
    step_delay: Duration,
    auto_progress: bool,
    reachable: AtomicBool,
    jobs: Arc<DashMap<ApplicationId, JoinHandle<()>>>,
}

impl SimulatedBackend {
    pub fn new(reports: mpsc::Sender<StatusReport>, step_delay: Duration, auto_progress: bool) -> Self {
        Self {
            reports,
            step_delay,
            auto_progress,
            reachable: AtomicBool::new(true),
            jobs: Arc::new(DashMap::new()),
        }
    }

    pub fn from_config(config: &BackendConfig, reports: mpsc::Sender<StatusReport>) -> Self {
        Self::new(reports, config.step_delay, config.auto_progress)
    }

    /// Simulate losing (or regaining) connectivity to the cluster.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of simulations still in flight.
    pub fn active_jobs(&self) -> usize {
        self.jobs.iter().filter(|job| !job.value().is_finished()).count()
    }

    fn ensure_reachable(&self) -> Result<(), BackendError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable("simulated cluster is unreachable".to_string()))
        }
    }

    fn progression(&self) -> Vec<ApplicationState> {
        if self.auto_progress {
            vec![
                ApplicationState::Submitted,
                ApplicationState::Running,
                ApplicationState::Completed,
            ]
        } else {
            vec![ApplicationState::Submitted]
        }
    }
}

#[async_trait]
impl ExecutionBackend for SimulatedBackend {
    async fn submit(&self, application: &SparkApplication) -> Result<(), BackendError> {
        self.ensure_reachable()?;
        self.jobs.retain(|_, job| !job.is_finished());

        let reports = self.reports.clone();
        let step_delay = self.step_delay;
        let states = self.progression();
        let namespace = application.namespace.clone();
        let id = application.id.clone();

        info!(namespace = %namespace, id = %id, "Simulated backend accepted submission");

        let job = tokio::spawn({
            let id = id.clone();
            async move {
                for state in states {
                    tokio::time::sleep(step_delay).await;
                    let report = StatusReport::new(&namespace, ApplicationRef::Id(id.clone()), state);
                    if reports.send(report).await.is_err() {
                        debug!(id = %id, "Status channel closed, stopping simulation");
                        return;
                    }
                }
            }
        });
        self.jobs.insert(id, job);

        Ok(())
    }

    async fn remove(&self, application: &SparkApplication) -> Result<(), BackendError> {
        self.ensure_reachable()?;

        match self.jobs.remove(&application.id) {
            Some((_, job)) => {
                job.abort();
                info!(id = %application.id, "Simulated backend stopped job");
            }
            None => {
                warn!(id = %application.id, "Simulated backend has no job to remove");
            }
        }
        Ok(())
    }
}
