// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod reconciler;
pub mod spark_application;

pub use reconciler::{ReconcileOutcome, StatusReconciler};
pub use spark_application::{SparkApplicationService, StandardSparkApplicationService};
