// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Request translator.
//!
//! Decodes wire messages into domain values and encodes domain values back.
//! Validation collects every violation before failing so a caller sees all
//! offending fields at once.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::domain::application::{
    ApplicationSpec, ApplicationState, ApplicationType, DeployMode as DomainDeployMode,
    SparkApplication as DomainApplication,
};
use crate::domain::events::ApplicationEvent;
use crate::domain::lifecycle::TransitionRequest;
use crate::presentation::wire::{
    ApplicationEventMessage, CreateSparkApplicationRequest, DeployMode, EnumValue,
    ListSparkApplicationsResponse, SparkApplication, SparkApplicationState, SparkApplicationType,
    TransitionStatusRequest,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub description: String,
}

impl FieldViolation {
    fn new(field: &str, description: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            description: description.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("malformed request path: {0}")]
    MalformedPath(String),

    #[error("invalid {}", join_violations(.0))]
    InvalidFields(Vec<FieldViolation>),
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9-]+$").expect("valid segment pattern"))
}

fn check_segment(field: &str, value: &str, violations: &mut Vec<FieldViolation>) {
    if value.is_empty() {
        violations.push(FieldViolation::new(field, "must not be empty"));
    } else if !segment_pattern().is_match(value) {
        violations.push(FieldViolation::new(field, "must match [a-z0-9-]+"));
    }
}

/// Checks path segments before any registry lookup. `name` is absent on
/// collection routes.
pub fn validate_path(namespace: &str, name: Option<&str>) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    check_segment("namespace", namespace, &mut violations);
    if let Some(name) = name {
        check_segment("name", name, &mut violations);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidFields(violations))
    }
}

pub fn decode_create_request(body: &[u8]) -> Result<CreateSparkApplicationRequest, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
}

pub fn to_application_spec(
    request: CreateSparkApplicationRequest,
) -> Result<ApplicationSpec, ValidationError> {
    let mut violations = Vec::new();

    let name = request.name.unwrap_or_default();
    check_segment("name", &name, &mut violations);

    let app_type = match request.app_type.as_ref() {
        None => {
            violations.push(FieldViolation::new("type", "must be set"));
            None
        }
        Some(value) => match SparkApplicationType::from_value(value) {
            Some(t) => {
                let app_type = domain_type(t);
                if app_type.is_none() {
                    violations.push(FieldViolation::new("type", "must not be UNSPECIFIED"));
                }
                app_type
            }
            None => {
                violations.push(FieldViolation::new("type", format!("unrecognized value {value}")));
                None
            }
        },
    };

    let mode = match request.mode.as_ref() {
        None => DomainDeployMode::Cluster,
        Some(value) => match DeployMode::from_value(value) {
            Some(DeployMode::Unspecified) | Some(DeployMode::Cluster) => DomainDeployMode::Cluster,
            Some(DeployMode::Client) => DomainDeployMode::Client,
            None => {
                violations.push(FieldViolation::new("mode", format!("unrecognized value {value}")));
                DomainDeployMode::Cluster
            }
        },
    };

    let main_application_file = request.main_application_file.unwrap_or_default();
    if main_application_file.is_empty() {
        violations.push(FieldViolation::new("mainApplicationFile", "must not be empty"));
    }

    let app_type = match app_type {
        Some(t) if violations.is_empty() => t,
        _ => return Err(ValidationError::InvalidFields(violations)),
    };

    Ok(ApplicationSpec {
        name,
        app_type,
        mode,
        image: request.image.unwrap_or_default(),
        main_application_file,
        main_class: request.main_class.unwrap_or_default(),
        arguments: request.arguments.unwrap_or_default(),
        driver: request.driver,
        executor: request.executor,
        deps: request.deps.unwrap_or_default(),
        spark_conf: request.spark_conf.unwrap_or_default(),
        spark_version: request.spark_version.unwrap_or_default(),
    })
}

fn domain_type(value: SparkApplicationType) -> Option<ApplicationType> {
    match value {
        SparkApplicationType::Unspecified => None,
        SparkApplicationType::Python => Some(ApplicationType::Python),
        SparkApplicationType::Scala => Some(ApplicationType::Scala),
        SparkApplicationType::Java => Some(ApplicationType::Java),
        SparkApplicationType::R => Some(ApplicationType::R),
    }
}

fn wire_type(value: ApplicationType) -> SparkApplicationType {
    match value {
        ApplicationType::Python => SparkApplicationType::Python,
        ApplicationType::Scala => SparkApplicationType::Scala,
        ApplicationType::Java => SparkApplicationType::Java,
        ApplicationType::R => SparkApplicationType::R,
    }
}

fn wire_mode(value: DomainDeployMode) -> DeployMode {
    match value {
        DomainDeployMode::Client => DeployMode::Client,
        DomainDeployMode::Cluster => DeployMode::Cluster,
    }
}

pub fn wire_state(value: ApplicationState) -> SparkApplicationState {
    match value {
        ApplicationState::Pending => SparkApplicationState::Pending,
        ApplicationState::Submitted => SparkApplicationState::Submitted,
        ApplicationState::Running => SparkApplicationState::Running,
        ApplicationState::Completed => SparkApplicationState::Completed,
        ApplicationState::Failed => SparkApplicationState::Failed,
        ApplicationState::Unknown => SparkApplicationState::Unknown,
    }
}

fn domain_state(value: SparkApplicationState) -> Option<ApplicationState> {
    match value {
        SparkApplicationState::Unspecified => None,
        SparkApplicationState::Pending => Some(ApplicationState::Pending),
        SparkApplicationState::Submitted => Some(ApplicationState::Submitted),
        SparkApplicationState::Running => Some(ApplicationState::Running),
        SparkApplicationState::Completed => Some(ApplicationState::Completed),
        SparkApplicationState::Failed => Some(ApplicationState::Failed),
        SparkApplicationState::Unknown => Some(ApplicationState::Unknown),
    }
}

pub fn to_wire(application: &DomainApplication) -> SparkApplication {
    let spec = &application.spec;
    SparkApplication {
        id: application.id.as_str().to_string(),
        name: spec.name.clone(),
        namespace: application.namespace.clone(),
        app_type: wire_type(spec.app_type),
        mode: wire_mode(spec.mode),
        image: spec.image.clone(),
        main_application_file: spec.main_application_file.clone(),
        main_class: spec.main_class.clone(),
        arguments: spec.arguments.clone(),
        driver: spec.driver.clone(),
        executor: spec.executor.clone(),
        deps: spec.deps.clone(),
        spark_conf: spec.spark_conf.clone(),
        spark_version: spec.spark_version.clone(),
        state: wire_state(application.state()),
    }
}

pub fn to_list_response(applications: &[DomainApplication]) -> ListSparkApplicationsResponse {
    ListSparkApplicationsResponse {
        applications: applications.iter().map(to_wire).collect(),
    }
}

pub fn to_wire_event(event: &ApplicationEvent) -> ApplicationEventMessage {
    match event {
        ApplicationEvent::Created {
            namespace,
            name,
            id,
            created_at,
        } => ApplicationEventMessage::Created {
            namespace: namespace.clone(),
            name: name.clone(),
            id: id.as_str().to_string(),
            created_at: *created_at,
        },
        ApplicationEvent::StateChanged {
            namespace,
            name,
            id,
            from,
            to,
            changed_at,
        } => ApplicationEventMessage::StateChanged {
            namespace: namespace.clone(),
            name: name.clone(),
            id: id.as_str().to_string(),
            from: wire_state(*from),
            to: wire_state(*to),
            changed_at: *changed_at,
        },
        ApplicationEvent::Deleted {
            namespace,
            name,
            id,
            deleted_at,
        } => ApplicationEventMessage::Deleted {
            namespace: namespace.clone(),
            name: name.clone(),
            id: id.as_str().to_string(),
            deleted_at: *deleted_at,
        },
    }
}

fn decode_state(
    field: &str,
    value: &EnumValue,
    violations: &mut Vec<FieldViolation>,
) -> Option<ApplicationState> {
    match SparkApplicationState::from_value(value).map(domain_state) {
        Some(Some(state)) => Some(state),
        Some(None) => {
            violations.push(FieldViolation::new(field, "must not be UNSPECIFIED"));
            None
        }
        None => {
            violations.push(FieldViolation::new(field, format!("unrecognized value {value}")));
            None
        }
    }
}

pub fn decode_transition_request(body: &[u8]) -> Result<TransitionRequest, ValidationError> {
    let request: TransitionStatusRequest =
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
    let mut violations = Vec::new();

    let target = match request.state.as_ref() {
        Some(value) => decode_state("state", value, &mut violations),
        None => {
            violations.push(FieldViolation::new("state", "must be set"));
            None
        }
    };
    let expected = request
        .expected_state
        .as_ref()
        .and_then(|value| decode_state("expectedState", value, &mut violations));
    let observed_at = match request.observed_at.as_deref() {
        None => None,
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                violations.push(FieldViolation::new("observedAt", format!("not RFC 3339: {e}")));
                None
            }
        },
    };

    let target = match target {
        Some(target) if violations.is_empty() => target,
        _ => return Err(ValidationError::InvalidFields(violations)),
    };

    let mut transition = TransitionRequest::to(target);
    if let Some(expected) = expected {
        transition = transition.expecting(expected);
    }
    if let Some(at) = observed_at {
        transition = transition.observed_at(at);
    }
    Ok(transition)
}
