// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Status reconciler.
//!
//! Consumes backend status reports and feeds them through the lifecycle rules.
//! A report that cannot be applied is dropped and counted, never retried: the
//! backend reports the current state again on its next update.

use metrics::counter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::spark_application::SparkApplicationService;
use crate::domain::application::ApplicationState;
use crate::domain::lifecycle::TransitionError;
use crate::domain::repository::RegistryError;
use crate::domain::status::StatusReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied {
        from: ApplicationState,
        to: ApplicationState,
    },
    /// Duplicate, out of order or addressed to a replaced resource.
    Stale,
    Rejected,
    /// No resource matches the report's target.
    Unmatched,
    Malformed,
}

pub struct StatusReconciler {
    service: Arc<dyn SparkApplicationService>,
}

impl StatusReconciler {
    pub fn new(service: Arc<dyn SparkApplicationService>) -> Self {
        Self { service }
    }

    pub async fn reconcile(&self, report: StatusReport) -> ReconcileOutcome {
        if !report.is_well_formed() {
            warn!(namespace = %report.namespace, target = %report.target, "Dropping malformed status report");
            dropped("malformed");
            return ReconcileOutcome::Malformed;
        }

        let request = report.to_transition_request();
        match self
            .service
            .transition_application(&report.namespace, &report.target, &request)
            .await
        {
            Ok(outcome) => ReconcileOutcome::Applied {
                from: outcome.previous,
                to: outcome.application.state(),
            },
            Err(RegistryError::Transition(TransitionError::StaleTransition { current, to, reason })) => {
                debug!(
                    namespace = %report.namespace,
                    target = %report.target,
                    %current,
                    %to,
                    "Ignoring stale status report: {}", reason
                );
                dropped(reason.label());
                ReconcileOutcome::Stale
            }
            Err(RegistryError::Transition(e @ TransitionError::InvalidTransition { .. })) => {
                warn!(namespace = %report.namespace, target = %report.target, "Rejected status report: {}", e);
                dropped("invalid_transition");
                ReconcileOutcome::Rejected
            }
            Err(RegistryError::NotFound { .. }) => {
                debug!(namespace = %report.namespace, target = %report.target, "Status report matches no application");
                dropped("not_found");
                ReconcileOutcome::Unmatched
            }
            Err(e) => {
                warn!(namespace = %report.namespace, target = %report.target, "Failed to apply status report: {}", e);
                dropped("error");
                ReconcileOutcome::Rejected
            }
        }
    }

    /// Drain reports until the channel closes or `shutdown` fires.
    pub async fn run(self, mut reports: mpsc::Receiver<StatusReport>, shutdown: CancellationToken) {
        info!("Status reconciler started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Status reconciler shutting down");
                    break;
                }
                report = reports.recv() => match report {
                    Some(report) => {
                        self.reconcile(report).await;
                    }
                    None => {
                        info!("Status channel closed, reconciler stopping");
                        break;
                    }
                },
            }
        }
    }

    pub fn spawn(
        self,
        reports: mpsc::Receiver<StatusReport>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(reports, shutdown))
    }
}

fn dropped(reason: &'static str) {
    counter!("spark_proxy_status_reports_dropped_total", "reason" => reason).increment(1);
}
