// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Spark application aggregate.
//!
//! A `SparkApplication` is the proxy's record of one submitted job. The
//! caller-supplied part lives in [`ApplicationSpec`] and is passed through to
//! the execution backend untouched; `id`, `state` and the timestamps are owned
//! by the proxy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque, process-unique application identifier. Never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Language of the submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationType {
    Python,
    Scala,
    Java,
    R,
}

/// Deployment topology of the Spark driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeployMode {
    Client,
    #[default]
    Cluster,
}

/// Lifecycle state. Transitions are governed by `domain::lifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationState {
    Pending,
    Submitted,
    Running,
    Completed,
    Failed,
    Unknown,
}

impl ApplicationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driver resource shape. Opaque to the proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DriverSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<i32>,
    #[serde(default, alias = "core_limit", skip_serializing_if = "Option::is_none")]
    pub core_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, alias = "memory_overhead", skip_serializing_if = "Option::is_none")]
    pub memory_overhead: Option<String>,
    #[serde(default, alias = "service_account", skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Executor resource shape. Opaque to the proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecutorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, alias = "memory_overhead", skip_serializing_if = "Option::is_none")]
    pub memory_overhead: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Caller-supplied job definition, already validated by the request translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSpec {
    pub name: String,
    pub app_type: ApplicationType,
    pub mode: DeployMode,
    pub image: String,
    pub main_application_file: String,
    pub main_class: String,
    pub arguments: Vec<String>,
    pub driver: Option<DriverSpec>,
    pub executor: Option<ExecutorSpec>,
    pub deps: Vec<String>,
    pub spark_conf: BTreeMap<String, String>,
    pub spark_version: String,
}

impl ApplicationSpec {
    /// Minimal spec with every optional field left empty.
    pub fn new(
        name: impl Into<String>,
        app_type: ApplicationType,
        main_application_file: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            app_type,
            mode: DeployMode::default(),
            image: String::new(),
            main_application_file: main_application_file.into(),
            main_class: String::new(),
            arguments: Vec::new(),
            driver: None,
            executor: None,
            deps: Vec::new(),
            spark_conf: BTreeMap::new(),
            spark_version: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparkApplication {
    pub id: ApplicationId,
    pub namespace: String,
    pub spec: ApplicationSpec,
    pub(crate) state: ApplicationState,
    pub created_at: DateTime<Utc>,
    /// Time of the last applied transition; starts at `created_at`.
    pub(crate) updated_at: DateTime<Utc>,
}

impl SparkApplication {
    /// New resources always start in `PENDING`.
    pub fn new(id: ApplicationId, namespace: impl Into<String>, spec: ApplicationSpec) -> Self {
        let now = Utc::now();
        Self {
            id,
            namespace: namespace.into(),
            spec,
            state: ApplicationState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn state(&self) -> ApplicationState {
        self.state
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
